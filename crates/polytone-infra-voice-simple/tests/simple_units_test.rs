use polytone_infra_voice_simple::{SimpleGain, SimpleVoice};
use polytone_ports::control::ControlKind;
use polytone_ports::voice::{EdgeScratch, VoiceUnit, ZoneId};
use pretty_assertions::assert_eq;

const GATE: ZoneId = ZoneId(3);
const LEVEL: ZoneId = ZoneId(6);

fn render(voice: &mut SimpleVoice, frames: usize) -> Vec<f32> {
    let mut out = vec![0.0; frames];
    voice.compute(frames, &[], &mut out);
    out
}

#[test]
fn voice_declares_note_controls_and_meter() {
    let voice = SimpleVoice::new();
    let zones = voice.declare_zones();
    let labels: Vec<&str> = zones.iter().map(|z| z.label.as_str()).collect();
    assert_eq!(
        labels,
        vec!["voice", "freq", "gain", "gate", "volume", "release", "level"]
    );
    assert_eq!(zones[0].kind, ControlKind::Group);
    assert_eq!(zones[3].kind, ControlKind::Toggle);
    assert_eq!(zones[6].kind, ControlKind::Meter);
    assert_eq!(zones[4].meta_values("midi").collect::<Vec<_>>(), vec!["ctrl 7"]);
}

#[test]
fn gated_voice_sounds_and_meters_its_peak() {
    let mut voice = SimpleVoice::new();
    voice.init(48_000);
    assert_eq!(render(&mut voice, 64), vec![0.0; 64]);

    voice.set_zone(GATE, 1.0);
    let out = render(&mut voice, 512);
    let peak = out.iter().fold(0.0_f32, |p, s| p.max(s.abs()));
    assert!(peak > 0.0);
    assert_eq!(voice.zone(LEVEL), peak);
    assert_eq!(voice.attacks(), 1);
}

#[test]
fn held_gate_does_not_restart_the_envelope() {
    let mut voice = SimpleVoice::new();
    voice.init(48_000);
    voice.set_zone(GATE, 1.0);
    render(&mut voice, 32);
    voice.set_zone(GATE, 1.0);
    render(&mut voice, 32);
    assert_eq!(voice.attacks(), 1);
}

#[test]
fn forced_edge_reset_restarts_the_envelope() {
    let mut voice = SimpleVoice::new();
    voice.init(48_000);
    let mut scratch = EdgeScratch::for_unit(&voice);

    voice.set_zone(GATE, 1.0);
    render(&mut voice, 32);
    voice.force_edge_reset(GATE, &mut scratch);
    assert_eq!(voice.zone(GATE), 0.0);

    voice.set_zone(GATE, 1.0);
    render(&mut voice, 32);
    assert_eq!(voice.attacks(), 2);
}

#[test]
fn init_restores_defaults() {
    let mut voice = SimpleVoice::new();
    voice.set_zone(ZoneId(1), 1000.0);
    voice.init(44_100);
    assert_eq!(voice.zone(ZoneId(1)), 440.0);
    assert_eq!(voice.zone(ZoneId(99)), 0.0);
}

#[test]
fn gain_scales_and_mutes() {
    let mut unit = SimpleGain::new();
    unit.init(48_000);
    let input = [0.5, -0.25, 0.125, 0.0];
    let mut out = [0.0; 4];

    unit.set_zone(ZoneId(0), 2.0);
    unit.compute(4, &input, &mut out);
    assert_eq!(out, [1.0, -0.5, 0.25, 0.0]);
    assert_eq!(unit.zone(ZoneId(2)), 1.0);

    unit.set_zone(ZoneId(1), 1.0);
    unit.compute(4, &input, &mut out);
    assert_eq!(out, [0.0; 4]);
}
