use polytone_domain_tuning::{
    parse_bank_file, parse_octave_tuning, ChannelBank, ChannelMask, MtsError, OctaveFormat,
};
use pretty_assertions::assert_eq;

fn one_byte_message(realtime: bool, mask: [u8; 3], data: [u8; 12]) -> Vec<u8> {
    let mut msg = vec![0xf0, if realtime { 0x7f } else { 0x7e }, 0x7f, 0x08, 0x08];
    msg.extend_from_slice(&mask);
    msg.extend_from_slice(&data);
    msg.push(0xf7);
    msg
}

fn two_byte_message(mask: [u8; 3], values: [u16; 12]) -> Vec<u8> {
    let mut msg = vec![0xf0, 0x7e, 0x7f, 0x08, 0x09];
    msg.extend_from_slice(&mask);
    for value in values {
        msg.push((value >> 7) as u8 & 0x7f);
        msg.push(value as u8 & 0x7f);
    }
    msg.push(0xf7);
    msg
}

#[test]
fn one_byte_offsets_are_cents() {
    let mut data = [64u8; 12];
    data[0] = 14; // -50 cents
    data[7] = 66; // +2 cents
    let msg = one_byte_message(true, [0x03, 0x7f, 0x7f], data);

    let tuning = parse_octave_tuning(&msg).expect("valid tuning");
    assert!(tuning.realtime);
    assert_eq!(tuning.format, OctaveFormat::OneByte);
    assert_eq!(tuning.channels, ChannelMask::ALL);
    assert!((tuning.offsets[0] + 0.5).abs() < 1e-6);
    assert!((tuning.offsets[7] - 0.02).abs() < 1e-6);
    assert_eq!(tuning.offsets[1], 0.0);
}

#[test]
fn two_byte_offsets_span_one_semitone() {
    let mut values = [8192u16; 12];
    values[2] = 0;
    values[4] = 8192 + 4096;
    let msg = two_byte_message([0x00, 0x00, 0x01], values);

    let tuning = parse_octave_tuning(&msg).expect("valid tuning");
    assert!(!tuning.realtime);
    assert_eq!(tuning.format, OctaveFormat::TwoByte);
    assert_eq!(tuning.channels, ChannelMask::single(0));
    assert_eq!(tuning.offsets[2], -1.0);
    assert_eq!(tuning.offsets[4], 0.5);
    assert_eq!(tuning.offsets[0], 0.0);
}

#[test]
fn framing_is_optional_for_live_messages() {
    let framed = one_byte_message(false, [0, 0, 1], [70; 12]);
    let unframed = &framed[1..framed.len() - 1];
    assert_eq!(
        parse_octave_tuning(&framed).expect("framed"),
        parse_octave_tuning(unframed).expect("unframed")
    );
}

#[test]
fn bank_files_require_framing() {
    let framed = one_byte_message(false, [0, 0, 1], [64; 12]);
    assert!(parse_bank_file(&framed).is_ok());
    assert_eq!(
        parse_bank_file(&framed[1..framed.len() - 1]),
        Err(MtsError::NotSysex)
    );
    assert_eq!(parse_bank_file(&framed[..framed.len() - 1]), Err(MtsError::NotSysex));
}

#[test]
fn rejects_wrong_manufacturer_and_length() {
    let mut msg = one_byte_message(false, [0, 0, 1], [64; 12]);
    msg[1] = 0x41;
    assert_eq!(parse_bank_file(&msg), Err(MtsError::NotUniversal(0x41)));

    let mut msg = one_byte_message(false, [0, 0, 1], [64; 12]);
    msg[3] = 0x04;
    assert_eq!(parse_bank_file(&msg), Err(MtsError::NotTuning(0x04)));

    let mut msg = one_byte_message(false, [0, 0, 1], [64; 12]);
    msg.insert(10, 64);
    assert_eq!(
        parse_bank_file(&msg),
        Err(MtsError::BadLength { format: 0x08, len: 20 })
    );

    let mut msg = one_byte_message(false, [0, 0, 1], [64; 12]);
    msg[4] = 0x02;
    assert_eq!(parse_bank_file(&msg), Err(MtsError::UnsupportedFormat(0x02)));

    assert_eq!(parse_octave_tuning(&[0x7e, 0x7f]), Err(MtsError::Truncated(2)));
}

#[test]
fn bulk_tuning_only_touches_selected_channel() {
    let msg = one_byte_message(false, [0x00, 0x00, 0x20], [80; 12]);
    let tuning = parse_octave_tuning(&msg).expect("valid tuning");

    let mut bank = ChannelBank::new();
    let mask = bank.apply_octave_tuning(&tuning);

    assert_eq!(mask.channels().collect::<Vec<_>>(), vec![5]);
    for ch in 0..16u8 {
        let expected = if ch == 5 { 0.16 } else { 0.0 };
        for offset in bank.channel(ch).pitch_classes {
            assert!((offset - expected).abs() < 1e-6, "channel {ch}");
        }
    }
}
