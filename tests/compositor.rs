use shotreel::{Compositor, ImageLoadState, Shot, SubtitleFont, SubtitleStyle, Surface};

fn compositor() -> Option<Compositor> {
    let path = shotreel::text::find_system_font()?;
    let font = SubtitleFont::from_path(&path).ok()?;
    Some(Compositor::new(font, SubtitleStyle::default()))
}

fn shot(dialogue: Option<&str>, image_url: Option<&str>) -> Shot {
    serde_json::from_value(serde_json::json!({
        "id": "shot-1",
        "visualAction": "hero walks into frame",
        "cameraAngle": "medium",
        "dialogue": dialogue,
        "imageUrl": image_url,
    }))
    .unwrap()
}

fn solid_image(w: u32, h: u32, rgba: [u8; 4]) -> image::RgbaImage {
    image::RgbaImage::from_pixel(w, h, image::Rgba(rgba))
}

#[test]
fn shot_without_dialogue_is_image_only() {
    let Some(mut compositor) = compositor() else {
        eprintln!("skipping: no system font available");
        return;
    };

    let mut surface = Surface::new(160, 90).unwrap();
    let img = solid_image(320, 180, [10, 200, 10, 255]);
    compositor.compose_shot(
        &mut surface,
        &shot(None, Some("x.png")),
        &ImageLoadState::Loaded(img),
    );

    // No strap, no text: every pixel is the cover-fitted image color,
    // including the bottom band where the strap would have been.
    for (x, y) in [(0, 0), (80, 45), (80, 88), (159, 89)] {
        assert_eq!(surface.pixel(x, y), Some([10, 200, 10, 255]), "at {x},{y}");
    }
}

#[test]
fn dialogue_draws_a_darkening_strap_over_the_bottom() {
    let Some(mut compositor) = compositor() else {
        eprintln!("skipping: no system font available");
        return;
    };

    let mut surface = Surface::new(200, 200).unwrap();
    let img = solid_image(200, 200, [200, 200, 200, 255]);
    compositor.compose_shot(
        &mut surface,
        &shot(Some("Hello there."), Some("x.png")),
        &ImageLoadState::Loaded(img),
    );

    // Top of the frame untouched by the strap.
    assert_eq!(surface.pixel(3, 3), Some([200, 200, 200, 255]));

    // Strap occupies the bottom 25%: its very top row is still transparent
    // (alpha stop 0), rows near the bottom are strongly darkened. Sample an
    // edge column to stay clear of the centered text.
    let strap_top = 150u32;
    assert_eq!(surface.pixel(1, strap_top), Some([200, 200, 200, 255]));
    let low = surface.pixel(1, 198).unwrap();
    assert!(low[0] < 60, "bottom of strap should be mostly black, got {low:?}");

    // Gradient is monotonically darkening downwards on the sampled column.
    let mut prev = 255u8;
    for y in strap_top..200 {
        let px = surface.pixel(1, y).unwrap();
        assert!(px[0] <= prev);
        prev = px[0];
    }
}

#[test]
fn dialogue_paints_outlined_text_above_the_bottom_margin() {
    let Some(mut compositor) = compositor() else {
        eprintln!("skipping: no system font available");
        return;
    };

    let mut surface = Surface::new(400, 400).unwrap();
    let img = solid_image(400, 400, [128, 128, 128, 255]);
    compositor.compose_shot(
        &mut surface,
        &shot(Some("A line of dialogue"), Some("x.png")),
        &ImageLoadState::Loaded(img),
    );

    // Somewhere in the text band there must be near-white fill pixels and
    // near-black stroke pixels. Text block bottom sits 8% above the bottom
    // edge; font size is 4% of height, so scan the plausible band.
    let mut has_fill = false;
    let mut has_stroke = false;
    for y in 320..368 {
        for x in 0..400 {
            let px = surface.pixel(x, y).unwrap();
            if px[0] > 230 && px[1] > 230 && px[2] > 230 {
                has_fill = true;
            }
            if px[0] < 25 && px[1] < 25 && px[2] < 25 {
                has_stroke = true;
            }
        }
    }
    assert!(has_fill, "expected white subtitle fill pixels");
    assert!(has_stroke, "expected black subtitle stroke pixels");
}

#[test]
fn failed_image_renders_deterministic_placeholder() {
    let Some(mut compositor) = compositor() else {
        eprintln!("skipping: no system font available");
        return;
    };

    let mut a = Surface::new(640, 360).unwrap();
    let mut b = Surface::new(640, 360).unwrap();
    let s = shot(None, Some("https://unreachable.invalid/x.png"));
    compositor.compose_shot(&mut a, &s, &ImageLoadState::Failed);
    compositor.compose_shot(&mut b, &s, &ImageLoadState::Failed);

    // Deterministic: two renders are identical.
    assert_eq!(a.data(), b.data());

    // Placeholder fill in the corners, label pixels somewhere near center.
    let corner = a.pixel(0, 0).unwrap();
    assert_eq!(corner, compositor.style().placeholder_rgba);
    let label_band: Vec<_> = (160..200)
        .flat_map(|y| (0..640).map(move |x| (x, y)))
        .filter_map(|(x, y)| a.pixel(x, y))
        .filter(|px| px[0] > 150 && px[1] > 150)
        .collect();
    assert!(!label_band.is_empty(), "expected 'missing image' label pixels");
}

#[test]
fn loading_image_takes_the_placeholder_path_too() {
    let Some(mut compositor) = compositor() else {
        eprintln!("skipping: no system font available");
        return;
    };

    let mut surface = Surface::new(160, 90).unwrap();
    compositor.compose_shot(
        &mut surface,
        &shot(None, Some("x.png")),
        &ImageLoadState::Loading,
    );
    assert_eq!(
        surface.pixel(2, 2),
        Some(compositor.style().placeholder_rgba)
    );
}

#[test]
fn shot_data_is_not_mutated_by_composition() {
    let Some(mut compositor) = compositor() else {
        eprintln!("skipping: no system font available");
        return;
    };

    let s = shot(Some("Dialogue stays put."), Some("x.png"));
    let before = serde_json::to_string(&s).unwrap();
    let mut surface = Surface::new(160, 90).unwrap();
    compositor.compose_shot(&mut surface, &s, &ImageLoadState::Failed);
    assert_eq!(serde_json::to_string(&s).unwrap(), before);
}
