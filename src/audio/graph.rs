// Audio render graph
// A small pull-based graph: buffer sources -> gain nodes -> destination.
// The output device (or a test) pulls mono frames with `Graph::render`.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use super::codec::DecodedAudioBuffer;
use crate::error::GraphError;

pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq)]
enum AutomationEvent {
    SetValue {
        value: f32,
        time: f64,
    },
    SetTarget {
        target: f32,
        start: f64,
        time_constant: f64,
    },
}

impl AutomationEvent {
    fn time(&self) -> f64 {
        match *self {
            AutomationEvent::SetValue { time, .. } => time,
            AutomationEvent::SetTarget { start, .. } => start,
        }
    }
}

/// Exponential approach towards `target`, anchored at `start`
#[derive(Debug, Clone, Copy, PartialEq)]
struct TargetRamp {
    start: f64,
    from: f32,
    target: f32,
    time_constant: f64,
}

impl TargetRamp {
    fn value_at(&self, time: f64) -> f32 {
        if self.time_constant <= 0.0 {
            return self.target;
        }
        let elapsed = (time - self.start).max(0.0);
        let decay = (-elapsed / self.time_constant).exp() as f32;
        self.target + (self.from - self.target) * decay
    }
}

/// A parameter whose value follows a timeline of automation events
#[derive(Debug, Clone)]
pub struct AudioParam {
    value: f32,
    ramp: Option<TargetRamp>,
    events: VecDeque<AutomationEvent>,
    last_time: f64,
}

impl AudioParam {
    pub fn new(value: f32) -> Self {
        Self {
            value,
            ramp: None,
            events: VecDeque::new(),
            last_time: 0.0,
        }
    }

    /// Jump to `value` at `time`
    pub fn set_value_at_time(&mut self, value: f32, time: f64) {
        self.schedule(AutomationEvent::SetValue { value, time });
    }

    /// Glide towards `target` starting at `start`; after one `time_constant`
    /// about 63% of the distance is covered.
    pub fn set_target_at_time(&mut self, target: f32, start: f64, time_constant: f64) {
        self.schedule(AutomationEvent::SetTarget {
            target,
            start,
            time_constant,
        });
    }

    fn schedule(&mut self, event: AutomationEvent) {
        // Events with equal times keep insertion order
        let at = self.events.partition_point(|e| e.time() <= event.time());
        self.events.insert(at, event);
    }

    /// Value at `time`, applying every event that is due
    pub fn value_at(&mut self, time: f64) -> f32 {
        while let Some(event) = self.events.front().copied() {
            if event.time() > time {
                break;
            }
            self.events.pop_front();
            match event {
                AutomationEvent::SetValue { value, .. } => {
                    self.value = value;
                    self.ramp = None;
                }
                AutomationEvent::SetTarget {
                    target,
                    start,
                    time_constant,
                } => {
                    let from = self.settled_at(start);
                    self.value = from;
                    self.ramp = Some(TargetRamp {
                        start,
                        from,
                        target,
                        time_constant,
                    });
                }
            }
        }
        self.last_time = self.last_time.max(time);
        self.settled_at(time)
    }

    /// Value at the most recently evaluated time
    pub fn value(&self) -> f32 {
        self.settled_at(self.last_time)
    }

    fn settled_at(&self, time: f64) -> f32 {
        match self.ramp {
            Some(ramp) => ramp.value_at(time),
            None => self.value,
        }
    }
}

#[derive(Debug)]
struct GainState {
    gain: AudioParam,
    to_destination: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceStatus {
    Created,
    Playing,
}

#[derive(Debug)]
struct SourceState {
    frames: Vec<f32>,
    buffer_rate: u32,
    position: f64,
    playback_rate: f32,
    output: Option<NodeId>,
    status: SourceStatus,
}

impl SourceState {
    /// Linear interpolation at the read head, or None once the buffer is exhausted
    fn next_sample(&mut self, step: f64) -> Option<f32> {
        let index = self.position.floor() as usize;
        let current = *self.frames.get(index)?;
        let next = self.frames.get(index + 1).copied().unwrap_or(current);
        let frac = (self.position - index as f64) as f32;
        self.position += step;
        Some(current + (next - current) * frac)
    }
}

/// Shared state of every node plus the frame clock
#[derive(Debug)]
pub struct Graph {
    sample_rate: u32,
    frames_rendered: u64,
    next_id: NodeId,
    gains: HashMap<NodeId, GainState>,
    sources: HashMap<NodeId, SourceState>,
}

impl Graph {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            frames_rendered: 0,
            next_id: 0,
            gains: HashMap::new(),
            sources: HashMap::new(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Used by the device adapter when the hardware runs at another rate.
    /// Keeps the clock position in seconds.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        let sample_rate = sample_rate.max(1);
        let now = self.current_time();
        self.sample_rate = sample_rate;
        self.frames_rendered = (now * sample_rate as f64).round() as u64;
    }

    /// Seconds of audio rendered so far
    pub fn current_time(&self) -> f64 {
        self.frames_rendered as f64 / self.sample_rate as f64
    }

    /// Sources that are started and still have frames left
    pub fn playing_sources(&self) -> usize {
        self.sources
            .values()
            .filter(|s| s.status == SourceStatus::Playing)
            .count()
    }

    fn allocate_id(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Fill `out` with mono frames and advance the clock by `out.len()` frames
    pub fn render(&mut self, out: &mut [f32]) {
        let context_rate = self.sample_rate as f64;

        for frame in out.iter_mut() {
            let time = self.frames_rendered as f64 / context_rate;
            let mut mix = 0.0f32;

            for source in self.sources.values_mut() {
                if source.status != SourceStatus::Playing {
                    continue;
                }
                let step = source.buffer_rate as f64 / context_rate * source.playback_rate as f64;
                let Some(sample) = source.next_sample(step) else {
                    continue;
                };
                let Some(gain) = source.output.and_then(|id| self.gains.get_mut(&id)) else {
                    continue;
                };
                let level = gain.gain.value_at(time);
                if gain.to_destination {
                    mix += sample * level;
                }
            }

            *frame = mix;
            self.frames_rendered += 1;
        }

        // Finished sources leave the graph; stopping them later reports SourceEnded
        self.sources.retain(|_, s| {
            s.status != SourceStatus::Playing || (s.position.floor() as usize) < s.frames.len()
        });
    }
}

/// Long-lived volume node
#[derive(Debug, Clone)]
pub struct GainNode {
    id: NodeId,
    graph: Arc<Mutex<Graph>>,
}

impl GainNode {
    pub(crate) fn create(graph: &Arc<Mutex<Graph>>, value: f32) -> Self {
        let mut g = graph.lock();
        let id = g.allocate_id();
        g.gains.insert(
            id,
            GainState {
                gain: AudioParam::new(value),
                to_destination: false,
            },
        );
        Self {
            id,
            graph: Arc::clone(graph),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn connect_to_destination(&self) {
        self.with_state(|s| s.to_destination = true);
    }

    pub fn set_value_at_time(&self, value: f32, time: f64) {
        self.with_state(|s| s.gain.set_value_at_time(value, time));
    }

    pub fn set_target_at_time(&self, target: f32, start: f64, time_constant: f64) {
        self.with_state(|s| s.gain.set_target_at_time(target, start, time_constant));
    }

    /// Gain at the context's current time
    pub fn value(&self) -> f32 {
        let mut g = self.graph.lock();
        let now = g.current_time();
        g.gains
            .get_mut(&self.id)
            .map(|s| s.gain.value_at(now))
            .unwrap_or(0.0)
    }

    fn with_state(&self, f: impl FnOnce(&mut GainState)) {
        if let Some(state) = self.graph.lock().gains.get_mut(&self.id) {
            f(state);
        }
    }
}

/// One-shot player for a decoded buffer
#[derive(Debug)]
pub struct SourceNode {
    id: NodeId,
    graph: Arc<Mutex<Graph>>,
}

impl SourceNode {
    pub(crate) fn create(graph: &Arc<Mutex<Graph>>, buffer: &DecodedAudioBuffer) -> Self {
        let mut g = graph.lock();
        let id = g.allocate_id();
        g.sources.insert(
            id,
            SourceState {
                frames: buffer.mixdown().into_owned(),
                buffer_rate: buffer.sample_rate(),
                position: 0.0,
                playback_rate: 1.0,
                output: None,
                status: SourceStatus::Created,
            },
        );
        Self {
            id,
            graph: Arc::clone(graph),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Scales both pitch and duration
    pub fn set_playback_rate(&self, rate: f32) -> Result<(), GraphError> {
        self.with_state(|s| s.playback_rate = rate.max(0.0))
    }

    pub fn connect(&self, gain: &GainNode) -> Result<(), GraphError> {
        let gain_id = gain.id();
        let mut g = self.graph.lock();
        if !g.gains.contains_key(&gain_id) {
            return Err(GraphError::NodeMissing(gain_id));
        }
        let source = g
            .sources
            .get_mut(&self.id)
            .ok_or(GraphError::SourceEnded)?;
        source.output = Some(gain_id);
        Ok(())
    }

    /// Begin playback on the next rendered frame
    pub fn start(&self) -> Result<(), GraphError> {
        let mut g = self.graph.lock();
        let source = g
            .sources
            .get_mut(&self.id)
            .ok_or(GraphError::SourceEnded)?;
        if source.status == SourceStatus::Playing {
            return Err(GraphError::AlreadyStarted);
        }
        source.status = SourceStatus::Playing;
        Ok(())
    }

    /// Silence the source immediately. Fails if it already ended on its own.
    pub fn stop(&self) -> Result<(), GraphError> {
        self.graph
            .lock()
            .sources
            .remove(&self.id)
            .map(|_| ())
            .ok_or(GraphError::SourceEnded)
    }

    pub fn has_ended(&self) -> bool {
        !self.graph.lock().sources.contains_key(&self.id)
    }

    fn with_state(&self, f: impl FnOnce(&mut SourceState)) -> Result<(), GraphError> {
        let mut g = self.graph.lock();
        let state = g
            .sources
            .get_mut(&self.id)
            .ok_or(GraphError::SourceEnded)?;
        f(state);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(rate: u32) -> Arc<Mutex<Graph>> {
        Arc::new(Mutex::new(Graph::new(rate)))
    }

    fn render(graph: &Arc<Mutex<Graph>>, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames];
        graph.lock().render(&mut out);
        out
    }

    fn buffer(rate: u32, samples: &[f32]) -> DecodedAudioBuffer {
        DecodedAudioBuffer::new(rate, vec![samples.to_vec()])
    }

    fn wired_gain(graph: &Arc<Mutex<Graph>>, value: f32) -> GainNode {
        let gain = GainNode::create(graph, value);
        gain.connect_to_destination();
        gain
    }

    #[test]
    fn test_unity_gain_passes_samples_through() {
        let g = graph(100);
        let gain = wired_gain(&g, 1.0);
        let source = SourceNode::create(&g, &buffer(100, &[0.5, -0.25, 0.75]));
        source.connect(&gain).unwrap();
        source.start().unwrap();

        assert_eq!(render(&g, 5), vec![0.5, -0.25, 0.75, 0.0, 0.0]);
        assert!(source.has_ended());
    }

    #[test]
    fn test_zero_gain_is_silent() {
        let g = graph(100);
        let gain = wired_gain(&g, 0.0);
        let source = SourceNode::create(&g, &buffer(100, &[0.5; 8]));
        source.connect(&gain).unwrap();
        source.start().unwrap();

        assert!(render(&g, 8).iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_unstarted_or_unconnected_sources_are_silent() {
        let g = graph(100);
        let gain = wired_gain(&g, 1.0);

        let idle = SourceNode::create(&g, &buffer(100, &[0.5; 4]));
        idle.connect(&gain).unwrap();

        let loose = SourceNode::create(&g, &buffer(100, &[0.5; 4]));
        loose.start().unwrap();

        assert!(render(&g, 4).iter().all(|s| *s == 0.0));
        assert!(!idle.has_ended());
    }

    #[test]
    fn test_playback_rate_changes_length() {
        let g = graph(100);
        let gain = wired_gain(&g, 1.0);
        let source = SourceNode::create(&g, &buffer(100, &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]));
        source.set_playback_rate(2.0).unwrap();
        source.connect(&gain).unwrap();
        source.start().unwrap();

        let out = render(&g, 6);
        assert_eq!(&out[..3], &[0.1, 0.3, 0.5]);
        assert_eq!(&out[3..], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_buffer_is_resampled_to_context_rate() {
        let g = graph(200);
        let gain = wired_gain(&g, 1.0);
        let source = SourceNode::create(&g, &buffer(100, &[0.0, 1.0]));
        source.connect(&gain).unwrap();
        source.start().unwrap();

        // Half steps interpolate; the last frame holds its value
        assert_eq!(render(&g, 5), vec![0.0, 0.5, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_stop_after_natural_end_fails() {
        let g = graph(100);
        let gain = wired_gain(&g, 1.0);
        let source = SourceNode::create(&g, &buffer(100, &[0.5]));
        source.connect(&gain).unwrap();
        source.start().unwrap();
        render(&g, 2);

        assert_eq!(source.stop(), Err(GraphError::SourceEnded));
    }

    #[test]
    fn test_stop_silences_immediately() {
        let g = graph(100);
        let gain = wired_gain(&g, 1.0);
        let source = SourceNode::create(&g, &buffer(100, &[0.5; 10]));
        source.connect(&gain).unwrap();
        source.start().unwrap();

        assert_eq!(render(&g, 2), vec![0.5, 0.5]);
        source.stop().unwrap();
        assert_eq!(render(&g, 2), vec![0.0, 0.0]);
        assert_eq!(source.stop(), Err(GraphError::SourceEnded));
        assert_eq!(source.start(), Err(GraphError::SourceEnded));
    }

    #[test]
    fn test_double_start_is_rejected() {
        let g = graph(100);
        let source = SourceNode::create(&g, &buffer(100, &[0.5; 4]));
        source.start().unwrap();
        assert_eq!(source.start(), Err(GraphError::AlreadyStarted));
    }

    #[test]
    fn test_target_ramp() {
        let mut param = AudioParam::new(1.0);
        param.set_target_at_time(0.0, 1.0, 0.1);

        // Nothing moves before the ramp starts
        assert_eq!(param.value_at(0.5), 1.0);
        assert_eq!(param.value_at(1.0), 1.0);

        let after_one_constant = param.value_at(1.1);
        assert!((after_one_constant - (-1.0f32).exp()).abs() < 1e-5);

        assert!(param.value_at(2.0) < 1e-4);
    }

    #[test]
    fn test_set_value_cancels_ramp() {
        let mut param = AudioParam::new(0.0);
        param.set_target_at_time(1.0, 0.0, 0.1);
        param.set_value_at_time(0.25, 0.05);

        assert!(param.value_at(0.01) > 0.0);
        assert_eq!(param.value_at(0.05), 0.25);
        assert_eq!(param.value_at(1.0), 0.25);
    }

    #[test]
    fn test_new_ramp_starts_from_current_value() {
        let mut param = AudioParam::new(1.0);
        param.set_target_at_time(0.0, 0.0, 0.1);
        param.set_target_at_time(1.0, 0.1, 0.1);

        let at_switch = param.value_at(0.1);
        assert!((at_switch - (-1.0f32).exp()).abs() < 1e-5);
        assert!(param.value_at(0.2) > at_switch);
    }

    #[test]
    fn test_gain_ramp_while_rendering() {
        let g = graph(1000);
        let gain = wired_gain(&g, 1.0);
        let source = SourceNode::create(&g, &buffer(1000, &[1.0; 1000]));
        source.connect(&gain).unwrap();
        source.start().unwrap();

        gain.set_target_at_time(0.0, 0.0, 0.1);
        let out = render(&g, 1000);

        assert_eq!(out[0], 1.0);
        assert!(out.windows(2).all(|w| w[1] <= w[0]));
        assert!((out[100] - (-1.0f32).exp()).abs() < 1e-3);
        assert!(gain.value() < 1e-3);
    }

    #[test]
    fn test_set_sample_rate_keeps_clock() {
        let mut g = Graph::new(100);
        g.render(&mut [0.0; 50]);
        g.set_sample_rate(200);
        assert_eq!(g.current_time(), 0.5);
        assert_eq!(g.sample_rate(), 200);
    }
}
