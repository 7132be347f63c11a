//! Non-Registered Parameter Number encoding.
//!
//! A parameter is addressed by two Control Change messages carrying the 8-bit halves of its code,
//! followed by one or two Data Entry messages carrying its value. Receivers assemble the address
//! from the first two messages, so the order is part of the wire contract.

use crate::error::{check_7bit, Result};
use crate::midi::{cc, MidiEvent};
use std::ops::Deref;

/// Identifies a synthesis parameter.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ParameterCode(pub u16);

impl ParameterCode {
    /// The address as transmitted, split into 8-bit halves.
    pub fn select_bytes(&self) -> (u16, u16) {
        (self.0 / 256, self.0 % 256)
    }
}

impl std::fmt::Display for ParameterCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// One or two data bytes. A missing `lsb` is transmitted as a shorter message, which receivers
/// treat differently from an `lsb` of zero.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct ParameterValue {
    pub msb: u8,
    pub lsb: Option<u8>,
}

impl ParameterValue {
    pub fn single(msb: u8) -> Self {
        Self { msb, lsb: None }
    }

    pub fn pair(msb: u8, lsb: u8) -> Self {
        Self {
            msb,
            lsb: Some(lsb),
        }
    }

    /// Splits a 14-bit quantity into 7-bit halves. Values of 16384 and above produce an `msb`
    /// that cannot be encoded.
    pub fn split(value: u16) -> Self {
        Self::pair((value / 128) as u8, (value % 128) as u8)
    }

    /// Reassembles a value produced by [`ParameterValue::split`].
    pub fn joined(&self) -> u16 {
        self.msb as u16 * 128 + self.lsb.unwrap_or(0) as u16
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Parameter {
    pub code: ParameterCode,
    pub value: ParameterValue,
}

impl Parameter {
    pub fn new(code: u16, value: ParameterValue) -> Self {
        Self {
            code: ParameterCode(code),
            value,
        }
    }

    pub fn encode(&self) -> Result<NrpnMessage> {
        encode(self.code, self.value)
    }
}

/// The three or four Control Change messages of one parameter, held inline.
#[derive(Copy, Clone, Debug)]
pub struct NrpnMessage {
    events: [MidiEvent; 4],
    len: usize,
}

impl Deref for NrpnMessage {
    type Target = [MidiEvent];

    fn deref(&self) -> &[MidiEvent] {
        &self.events[..self.len]
    }
}

/// Encodes a parameter change. Every byte is validated before any message is built, so an
/// out-of-range input never yields a partial sequence.
pub fn encode(code: ParameterCode, value: ParameterValue) -> Result<NrpnMessage> {
    let (high, low) = code.select_bytes();
    let high = check_7bit("parameter code", high as u8)?;
    let low = check_7bit("parameter code", low as u8)?;
    let msb = check_7bit("data msb", value.msb)?;
    let lsb = value.lsb.map(|lsb| check_7bit("data lsb", lsb)).transpose()?;

    let mut events = [MidiEvent::Invalid; 4];
    events[0] = MidiEvent::control_change(cc::NRPN_MSB, high)?;
    events[1] = MidiEvent::control_change(cc::NRPN_LSB, low)?;
    events[2] = MidiEvent::control_change(cc::DATA_ENTRY_MSB, msb)?;
    let len = match lsb {
        Some(lsb) => {
            events[3] = MidiEvent::control_change(cc::DATA_ENTRY_LSB, lsb)?;
            4
        }
        None => 3,
    };

    Ok(NrpnMessage { events, len })
}

/// Encodes a whole parameter sequence. Nothing is returned unless every parameter is valid.
pub fn encode_all(parameters: &[Parameter], out: &mut Vec<MidiEvent>) -> Result<()> {
    let start = out.len();
    for parameter in parameters {
        match parameter.encode() {
            Ok(message) => out.extend_from_slice(&message),
            Err(err) => {
                out.truncate(start);
                return Err(err);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::EngineError;
    use proptest::prelude::*;

    fn controls(message: &[MidiEvent]) -> Vec<(u8, u8)> {
        message
            .iter()
            .map(|event| match *event {
                MidiEvent::ControlChange { control, value, .. } => (control, value),
                other => panic!("unexpected event {:?}", other),
            })
            .collect()
    }

    #[test]
    fn test_single_byte_value() {
        let message = encode(ParameterCode(0x5002), ParameterValue::single(0x45)).unwrap();
        assert_eq!(controls(&message), vec![(99, 0x50), (98, 0x02), (6, 0x45)]);
    }

    #[test]
    fn test_two_byte_value() {
        let message = encode(ParameterCode(0x6001), ParameterValue::pair(0x1e, 0x50)).unwrap();
        assert_eq!(controls(&message), vec![(99, 0x60), (98, 0x01), (6, 0x1e), (38, 0x50)]);
    }

    #[test]
    fn test_zero_lsb_is_sent() {
        let message = encode(ParameterCode(0x5000), ParameterValue::pair(0, 0)).unwrap();
        assert_eq!(message.len(), 4);
    }

    #[test]
    fn test_rejects_out_of_range() {
        let err = encode(ParameterCode(0x5080), ParameterValue::single(0)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter { .. }));
        assert!(encode(ParameterCode(0x8000), ParameterValue::single(0)).is_err());
        assert!(encode(ParameterCode(0x5000), ParameterValue::single(0x80)).is_err());
        assert!(encode(ParameterCode(0x5000), ParameterValue::pair(0, 0x80)).is_err());
    }

    #[test]
    fn test_encode_all_is_all_or_nothing() {
        let mut out = vec![];
        let parameters = [
            Parameter::new(0x5002, ParameterValue::single(0x45)),
            Parameter::new(0x5004, ParameterValue::split(20_000)),
        ];
        assert!(encode_all(&parameters, &mut out).is_err());
        assert!(out.is_empty());

        encode_all(&parameters[..1], &mut out).unwrap();
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_split() {
        assert_eq!(ParameterValue::split(3920), ParameterValue::pair(30, 80));
        assert_eq!(ParameterValue::split(569), ParameterValue::pair(4, 57));
        assert_eq!(ParameterValue::split(0), ParameterValue::pair(0, 0));
    }

    proptest! {
        #[test]
        fn message_count_follows_lsb(high in 0u16..128, low in 0u16..128, msb in 0u8..128, lsb in proptest::option::of(0u8..128)) {
            let code = ParameterCode(high * 256 + low);
            let message = encode(code, ParameterValue { msb, lsb }).unwrap();
            prop_assert_eq!(message.len(), if lsb.is_some() { 4 } else { 3 });
            let pairs = controls(&message);
            prop_assert_eq!(pairs[0], (99, (code.0 / 256) as u8));
            prop_assert_eq!(pairs[1], (98, (code.0 % 256) as u8));
            prop_assert_eq!(pairs[2], (6, msb));
        }

        #[test]
        fn wide_codes_are_rejected(code in 0u16..=u16::MAX) {
            let encodable = code / 256 < 128 && code % 256 < 128;
            prop_assert_eq!(encode(ParameterCode(code), ParameterValue::single(0)).is_ok(), encodable);
        }

        #[test]
        fn split_reconstructs(value in 0u16..16384) {
            let split = ParameterValue::split(value);
            prop_assert_eq!(split, ParameterValue::pair((value / 128) as u8, (value % 128) as u8));
            prop_assert_eq!(split.joined(), value);
            prop_assert!(split.msb < 128);
        }
    }
}
