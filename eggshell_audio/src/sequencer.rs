//! Looping melody playback with in-flight-safe replacement.
//!
//! A [`Melody`] is a list of tones played one pass at a time, each note
//! offset from the previous by a fixed spacing. Replacing the tone list
//! mid-pass never disturbs the pass already underway: the new list is
//! staged and swapped in when the next pass begins. [`Sequencer`] drives
//! a melody from a background thread and hands notes to a [`ToneSink`].

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::mapping::Tone;

/// Delay between consecutive note starts within a pass.
pub const DEFAULT_NOTE_SPACING: Duration = Duration::from_millis(500);

/// Destination for scheduled notes. Implementations decide what
/// "playing a tone" means; the synth backend starts an oscillator,
/// tests record the call.
pub trait ToneSink: Send {
    /// Request that `tone` start sounding `start_offset` from now.
    fn schedule(&mut self, tone: Tone, start_offset: Duration);
}

/// Where the melody is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Not playing. Tones may be edited directly.
    Idle,
    /// Looping passes over the tone list.
    Playing,
    /// Finishing the current pass, then stopping.
    Stopping,
}

/// The pure scheduling core: tone list, staged replacement, and the
/// pass state machine. Contains no timing of its own so it can be
/// driven (and tested) step by step.
#[derive(Debug)]
pub struct Melody {
    tones: Vec<Tone>,
    /// Replacement list staged by [`set_melody`](Self::set_melody) while
    /// a pass is in flight. Applied at the start of the next pass.
    pending: Option<Vec<Tone>>,
    state: PlaybackState,
    note_spacing: Duration,
}

impl Melody {
    pub fn new(note_spacing: Duration) -> Self {
        Melody {
            tones: Vec::new(),
            pending: None,
            state: PlaybackState::Idle,
            note_spacing,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn tones(&self) -> &[Tone] {
        &self.tones
    }

    /// Append a tone. Only allowed before playback begins; once playing,
    /// use [`set_melody`](Self::set_melody) to replace the whole list.
    pub fn add_tone(&mut self, tone: Tone) -> bool {
        if self.state != PlaybackState::Idle {
            return false;
        }
        self.tones.push(tone);
        true
    }

    /// Stage a full replacement built from parallel frequency and gain
    /// slices. Extra entries in the longer slice are ignored. If idle,
    /// the replacement takes effect immediately; otherwise it is applied
    /// when the current pass ends.
    pub fn set_melody(&mut self, frequencies: &[f32], gains: &[f32]) {
        let tones: Vec<Tone> = frequencies
            .iter()
            .zip(gains.iter())
            .map(|(&frequency, &gain)| Tone::new(frequency, gain))
            .collect();
        if self.state == PlaybackState::Idle {
            self.tones = tones;
            self.pending = None;
        } else {
            self.pending = Some(tones);
        }
    }

    pub fn play(&mut self) {
        match self.state {
            PlaybackState::Idle | PlaybackState::Stopping => {
                self.state = PlaybackState::Playing;
            }
            PlaybackState::Playing => {}
        }
    }

    /// Let the current pass finish, then go idle. No-op when idle.
    pub fn stop(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Stopping;
        }
    }

    /// Start a pass: apply any staged replacement, then return each tone
    /// with its offset from the pass start. Returns an empty schedule
    /// when not playing or when the tone list is empty.
    pub fn begin_pass(&mut self) -> Vec<(Tone, Duration)> {
        if let Some(tones) = self.pending.take() {
            self.tones = tones;
        }
        if self.state != PlaybackState::Playing {
            return Vec::new();
        }
        self.tones
            .iter()
            .enumerate()
            .map(|(i, &tone)| (tone, self.note_spacing * i as u32))
            .collect()
    }

    /// How long a pass occupies before the next one may start. An empty
    /// melody still takes one spacing so the driver never spins.
    pub fn pass_duration(&self) -> Duration {
        let len = self.tones.len().max(1);
        self.note_spacing * len as u32
    }

    /// End the pass that `begin_pass` started. A `Stopping` melody
    /// becomes idle here, after its final pass has fully sounded.
    pub fn finish_pass(&mut self) {
        if self.state == PlaybackState::Stopping {
            self.state = PlaybackState::Idle;
        }
    }
}

enum Command {
    AddTone(Tone),
    SetMelody(Vec<f32>, Vec<f32>),
    Play,
    Stop,
    Shutdown,
}

/// Drives a [`Melody`] from a background thread, dispatching notes to a
/// [`ToneSink`]. Commands are applied between passes with the same
/// in-flight guarantees as the pure core.
pub struct Sequencer {
    commands: Sender<Command>,
    thread: Option<JoinHandle<()>>,
}

impl Sequencer {
    /// Spawn the driver thread. The melody starts idle and empty.
    pub fn spawn<S: ToneSink + 'static>(mut sink: S, note_spacing: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        let thread = thread::spawn(move || {
            let mut melody = Melody::new(note_spacing);
            // Deadline for the next pass start, set while playing.
            let mut next_pass: Option<Instant> = None;
            loop {
                let command = match next_pass {
                    Some(deadline) => {
                        let now = Instant::now();
                        if now >= deadline {
                            melody.finish_pass();
                            if melody.state() == PlaybackState::Playing {
                                for (tone, offset) in melody.begin_pass() {
                                    sink.schedule(tone, offset);
                                }
                                next_pass = Some(now + melody.pass_duration());
                            } else {
                                next_pass = None;
                            }
                            continue;
                        }
                        match rx.recv_timeout(deadline - now) {
                            Ok(command) => command,
                            Err(RecvTimeoutError::Timeout) => continue,
                            Err(RecvTimeoutError::Disconnected) => break,
                        }
                    }
                    None => match rx.recv() {
                        Ok(command) => command,
                        Err(_) => break,
                    },
                };
                match command {
                    Command::AddTone(tone) => {
                        melody.add_tone(tone);
                    }
                    Command::SetMelody(frequencies, gains) => {
                        melody.set_melody(&frequencies, &gains);
                    }
                    Command::Play => {
                        melody.play();
                        if next_pass.is_none() {
                            for (tone, offset) in melody.begin_pass() {
                                sink.schedule(tone, offset);
                            }
                            next_pass = Some(Instant::now() + melody.pass_duration());
                        }
                    }
                    Command::Stop => melody.stop(),
                    Command::Shutdown => break,
                }
            }
        });
        Sequencer {
            commands: tx,
            thread: Some(thread),
        }
    }

    pub fn add_tone(&self, tone: Tone) {
        let _ = self.commands.send(Command::AddTone(tone));
    }

    /// Replace the tone list. A pass already underway finishes with the
    /// old tones; the new ones take over at the next pass boundary.
    pub fn set_melody(&self, frequencies: &[f32], gains: &[f32]) {
        let _ = self
            .commands
            .send(Command::SetMelody(frequencies.to_vec(), gains.to_vec()));
    }

    pub fn play(&self) {
        let _ = self.commands.send(Command::Play);
    }

    pub fn stop(&self) {
        let _ = self.commands.send(Command::Stop);
    }

    /// Stop the driver thread and wait for it to exit.
    pub fn shutdown(mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for Sequencer {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn melody_with(frequencies: &[f32]) -> Melody {
        let mut melody = Melody::new(Duration::from_millis(10));
        let gains: Vec<f32> = frequencies.iter().map(|_| 0.3).collect();
        melody.set_melody(frequencies, &gains);
        melody
    }

    #[test]
    fn add_tone_refused_while_playing() {
        let mut melody = Melody::new(Duration::from_millis(10));
        assert!(melody.add_tone(Tone::new(220.0, 0.2)));
        melody.play();
        assert!(!melody.add_tone(Tone::new(330.0, 0.2)));
        assert_eq!(melody.tones().len(), 1);
    }

    #[test]
    fn pass_offsets_are_staggered_by_spacing() {
        let mut melody = melody_with(&[100.0, 200.0, 300.0]);
        melody.play();
        let pass = melody.begin_pass();
        let offsets: Vec<Duration> = pass.iter().map(|&(_, offset)| offset).collect();
        assert_eq!(
            offsets,
            vec![
                Duration::ZERO,
                Duration::from_millis(10),
                Duration::from_millis(20),
            ]
        );
        assert_eq!(melody.pass_duration(), Duration::from_millis(30));
    }

    #[test]
    fn set_melody_while_playing_waits_for_pass_boundary() {
        let mut melody = melody_with(&[100.0, 200.0, 300.0]);
        melody.play();
        let first: Vec<f32> = melody
            .begin_pass()
            .iter()
            .map(|(tone, _)| tone.frequency)
            .collect();
        assert_eq!(first, vec![100.0, 200.0, 300.0]);

        // Mid-pass replacement must not touch the in-flight tones.
        melody.set_melody(&[400.0, 500.0], &[0.4, 0.4]);
        let visible: Vec<f32> = melody.tones().iter().map(|t| t.frequency).collect();
        assert_eq!(visible, vec![100.0, 200.0, 300.0]);

        melody.finish_pass();
        let second: Vec<f32> = melody
            .begin_pass()
            .iter()
            .map(|(tone, _)| tone.frequency)
            .collect();
        assert_eq!(second, vec![400.0, 500.0]);
    }

    #[test]
    fn set_melody_while_idle_applies_immediately() {
        let mut melody = melody_with(&[100.0]);
        melody.set_melody(&[250.0, 350.0], &[0.2, 0.2]);
        let frequencies: Vec<f32> = melody.tones().iter().map(|t| t.frequency).collect();
        assert_eq!(frequencies, vec![250.0, 350.0]);
    }

    #[test]
    fn mismatched_lengths_truncate_to_shorter() {
        let mut melody = Melody::new(Duration::from_millis(10));
        melody.set_melody(&[100.0, 200.0, 300.0], &[0.1, 0.2]);
        assert_eq!(melody.tones().len(), 2);
    }

    #[test]
    fn stop_finishes_current_pass_before_going_idle() {
        let mut melody = melody_with(&[100.0, 200.0]);
        melody.play();
        let pass = melody.begin_pass();
        assert_eq!(pass.len(), 2);
        melody.stop();
        assert_eq!(melody.state(), PlaybackState::Stopping);
        melody.finish_pass();
        assert_eq!(melody.state(), PlaybackState::Idle);
        // A stopped melody schedules nothing.
        assert!(melody.begin_pass().is_empty());
    }

    #[test]
    fn play_while_stopping_resumes_without_going_idle() {
        let mut melody = melody_with(&[100.0]);
        melody.play();
        melody.stop();
        melody.play();
        assert_eq!(melody.state(), PlaybackState::Playing);
    }

    #[test]
    fn empty_melody_pass_still_takes_one_spacing() {
        let melody = Melody::new(Duration::from_millis(10));
        assert_eq!(melody.pass_duration(), Duration::from_millis(10));
    }

    #[derive(Clone)]
    struct RecordingSink {
        scheduled: Arc<Mutex<Vec<(Tone, Duration)>>>,
    }

    impl RecordingSink {
        fn new() -> Self {
            RecordingSink {
                scheduled: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn frequencies(&self) -> Vec<f32> {
            self.scheduled
                .lock()
                .unwrap()
                .iter()
                .map(|(tone, _)| tone.frequency)
                .collect()
        }
    }

    impl ToneSink for RecordingSink {
        fn schedule(&mut self, tone: Tone, start_offset: Duration) {
            self.scheduled.lock().unwrap().push((tone, start_offset));
        }
    }

    #[test]
    fn sequencer_replaces_melody_at_pass_boundary() {
        let sink = RecordingSink::new();
        // Long spacing so the replacement command always lands inside the
        // first pass: Play and SetMelody travel the same channel, and the
        // driver stages the replacement long before the 450ms pass ends.
        let sequencer = Sequencer::spawn(sink.clone(), Duration::from_millis(150));
        sequencer.set_melody(&[100.0, 200.0, 300.0], &[0.3, 0.3, 0.3]);
        sequencer.play();
        sequencer.set_melody(&[400.0, 500.0], &[0.4, 0.4]);

        let deadline = Instant::now() + Duration::from_secs(5);
        while sink.frequencies().len() < 5 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        sequencer.stop();
        sequencer.shutdown();

        let frequencies = sink.frequencies();
        // The first pass completed untouched; the replacement started
        // cleanly at the next pass boundary.
        assert!(frequencies.len() >= 5, "got {frequencies:?}");
        assert_eq!(&frequencies[..5], &[100.0, 200.0, 300.0, 400.0, 500.0]);
        for chunk in frequencies[3..].chunks_exact(2) {
            assert_eq!(chunk, &[400.0, 500.0]);
        }
    }
}
