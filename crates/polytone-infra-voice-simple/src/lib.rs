mod gain;
mod sine;

pub use gain::SimpleGain;
pub use sine::SimpleVoice;

fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0_f32, |peak, s| peak.max(s.abs()))
}
