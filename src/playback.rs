use std::time::{Duration, Instant};

use crate::model::{PREVIEW_HOLD_MS, PREVIEW_TICK_MS};

/// Drives the live slideshow preview.
///
/// Progress for the active shot is derived from wall-clock time elapsed since
/// the shot became active, not from per-tick increments, so tick jitter never
/// accumulates into drift. While an export run holds the lock, play/pause
/// toggles are ignored.
#[derive(Debug)]
pub struct PlaybackClock {
    shot_count: usize,
    index: usize,
    /// Percent complete of the active shot, 0..=100.
    progress: f64,
    playing: bool,
    /// Synthetic start of the active shot; back-dated on resume so elapsed-time
    /// math stays continuous.
    started: Instant,
    hold: Duration,
    export_locked: bool,
}

impl PlaybackClock {
    pub fn new(shot_count: usize) -> Self {
        Self::with_hold(shot_count, Duration::from_millis(PREVIEW_HOLD_MS))
    }

    pub fn with_hold(shot_count: usize, hold: Duration) -> Self {
        Self {
            shot_count,
            index: 0,
            progress: 0.0,
            playing: shot_count > 0,
            started: Instant::now(),
            hold: if hold.is_zero() {
                Duration::from_millis(PREVIEW_HOLD_MS)
            } else {
                hold
            },
            export_locked: false,
        }
    }

    /// Recommended interval between [`tick`](Self::tick) calls.
    pub fn tick_interval() -> Duration {
        Duration::from_millis(PREVIEW_TICK_MS)
    }

    pub fn shot_index(&self) -> usize {
        self.index
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// True once the last shot has played out and progress is pinned at 100.
    pub fn is_finished(&self) -> bool {
        !self.playing && self.shot_count > 0 && self.index + 1 == self.shot_count
            && self.progress >= 100.0
    }

    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Advance based on elapsed time at `now`. When the active shot completes:
    /// move to the next shot with progress reset, or pin at 100 and stop on the
    /// last one.
    pub fn tick_at(&mut self, now: Instant) {
        if !self.playing || self.shot_count == 0 {
            return;
        }
        let elapsed = now.saturating_duration_since(self.started);
        let pct = elapsed.as_secs_f64() / self.hold.as_secs_f64() * 100.0;

        if pct < 100.0 {
            self.progress = pct;
            return;
        }
        if self.index + 1 < self.shot_count {
            self.index += 1;
            self.progress = 0.0;
            self.started = now;
        } else {
            self.progress = 100.0;
            self.playing = false;
        }
    }

    /// Manual scrub/jump: activates `index` with progress 0 and a fresh
    /// timestamp, regardless of play state.
    pub fn jump_to(&mut self, index: usize) {
        self.jump_to_at(index, Instant::now());
    }

    pub fn jump_to_at(&mut self, index: usize, now: Instant) {
        if self.shot_count == 0 {
            return;
        }
        self.index = index.min(self.shot_count - 1);
        self.progress = 0.0;
        self.started = now;
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.set_playing_at(playing, Instant::now());
    }

    /// Pause keeps progress; resume back-dates the synthetic start time from the
    /// preserved progress so there is no time jump.
    pub fn set_playing_at(&mut self, playing: bool, now: Instant) {
        if self.export_locked || self.shot_count == 0 {
            return;
        }
        if playing == self.playing {
            return;
        }
        if playing {
            if self.is_finished() {
                return;
            }
            let consumed = self.hold.mul_f64((self.progress / 100.0).clamp(0.0, 1.0));
            self.started = now - consumed;
        }
        self.playing = playing;
    }

    /// Explicit restart after reaching the end: back to shot 0, progress 0,
    /// playing.
    pub fn restart(&mut self) {
        self.restart_at(Instant::now());
    }

    pub fn restart_at(&mut self, now: Instant) {
        if self.shot_count == 0 {
            return;
        }
        self.index = 0;
        self.progress = 0.0;
        self.started = now;
        self.playing = !self.export_locked;
    }

    /// An export run forces the preview to pause and ignores playback toggles
    /// until [`unlock`](Self::unlock).
    pub fn lock_for_export(&mut self) {
        self.playing = false;
        self.export_locked = true;
    }

    pub fn unlock(&mut self) {
        self.export_locked = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(shots: usize, hold_ms: u64) -> (PlaybackClock, Instant) {
        let hold = Duration::from_millis(hold_ms);
        let clock = PlaybackClock::with_hold(shots, hold);
        let start = clock.started;
        (clock, start)
    }

    fn run_ticks(clock: &mut PlaybackClock, start: Instant, upto_ms: u64, step_ms: u64) {
        let mut t = 0;
        while t <= upto_ms {
            clock.tick_at(start + Duration::from_millis(t));
            t += step_ms;
        }
    }

    #[test]
    fn progress_tracks_elapsed_time() {
        let (mut clock, start) = clock(2, 3000);
        clock.tick_at(start + Duration::from_millis(1500));
        assert_eq!(clock.shot_index(), 0);
        assert!((clock.progress() - 50.0).abs() < 1.0);
    }

    #[test]
    fn three_shot_slideshow_advances_and_halts() {
        // 3 shots, 3000 ms hold, 50 ms tick: advance at ~3000 and ~6000 ms,
        // halt at index 2 / progress 100 at ~9000 ms.
        let (mut clock, start) = clock(3, 3000);

        run_ticks(&mut clock, start, 2950, 50);
        assert_eq!(clock.shot_index(), 0);
        run_ticks(&mut clock, start, 3050, 50);
        assert_eq!(clock.shot_index(), 1);
        assert!(clock.progress() < 100.0);

        run_ticks(&mut clock, start, 6050, 50);
        assert_eq!(clock.shot_index(), 2);

        run_ticks(&mut clock, start, 9100, 50);
        assert_eq!(clock.shot_index(), 2);
        assert_eq!(clock.progress(), 100.0);
        assert!(!clock.is_playing());
        assert!(clock.is_finished());

        // No index overflow from further ticks.
        clock.tick_at(start + Duration::from_millis(20_000));
        assert_eq!(clock.shot_index(), 2);
    }

    #[test]
    fn single_hold_worth_of_ticks_reaches_shot_one() {
        let (mut clock, start) = clock(2, 1000);
        run_ticks(&mut clock, start, 1000, 50);
        assert_eq!(clock.shot_index(), 1);
        assert_eq!(clock.progress(), 0.0);
    }

    #[test]
    fn pause_preserves_progress_and_resume_is_continuous() {
        let (mut clock, start) = clock(2, 1000);
        clock.tick_at(start + Duration::from_millis(400));
        let paused_at = clock.progress();
        clock.set_playing_at(false, start + Duration::from_millis(400));

        // Ticks while paused change nothing.
        clock.tick_at(start + Duration::from_millis(900));
        assert_eq!(clock.progress(), paused_at);

        // Resume much later; progress picks up from where it stopped.
        let resume = start + Duration::from_millis(5000);
        clock.set_playing_at(true, resume);
        clock.tick_at(resume + Duration::from_millis(100));
        assert!((clock.progress() - (paused_at + 10.0)).abs() < 1.0);
    }

    #[test]
    fn jump_resets_progress_and_timestamp_even_when_paused() {
        let (mut clock, start) = clock(3, 1000);
        clock.set_playing_at(false, start);
        clock.jump_to_at(2, start + Duration::from_millis(100));
        assert_eq!(clock.shot_index(), 2);
        assert_eq!(clock.progress(), 0.0);
        assert!(!clock.is_playing());
    }

    #[test]
    fn jump_clamps_to_last_shot() {
        let (mut clock, start) = clock(3, 1000);
        clock.jump_to_at(99, start);
        assert_eq!(clock.shot_index(), 2);
    }

    #[test]
    fn export_lock_forces_pause_and_ignores_toggles() {
        let (mut clock, start) = clock(2, 1000);
        clock.lock_for_export();
        assert!(!clock.is_playing());
        clock.set_playing_at(true, start);
        assert!(!clock.is_playing());
        clock.unlock();
        clock.set_playing_at(true, start);
        assert!(clock.is_playing());
    }

    #[test]
    fn restart_after_finish_returns_to_start() {
        let (mut clock, start) = clock(2, 100);
        run_ticks(&mut clock, start, 500, 10);
        assert!(clock.is_finished());
        clock.restart_at(start + Duration::from_millis(600));
        assert_eq!(clock.shot_index(), 0);
        assert_eq!(clock.progress(), 0.0);
        assert!(clock.is_playing());
    }

    #[test]
    fn empty_shot_list_never_plays() {
        let (mut clock, start) = clock(0, 1000);
        assert!(!clock.is_playing());
        clock.tick_at(start + Duration::from_millis(100));
        assert_eq!(clock.shot_index(), 0);
        assert!(!clock.is_finished());
    }
}
