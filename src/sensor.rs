//! TI SensorTag thermopile decoding.
//!
//! The IR temperature characteristic serves four bytes: a raw object
//! voltage reading (signed 16-bit LE) followed by a raw die temperature
//! (signed 16-bit LE). The die temperature converts directly; the object
//! temperature needs the TMP006 sensor calibration below.

use serde::Serialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TemperatureReading {
    pub ambient_celsius: f64,
    pub object_celsius: f64,
}

/// Decodes one IR temperature characteristic sample.
pub fn decode_temperature(data: &[u8]) -> Result<TemperatureReading> {
    if data.len() < 4 {
        return Err(Error::Truncated("temperature sample"));
    }

    let raw_object = raw_sample(data[0], data[1]);
    let raw_ambient = raw_sample(data[2], data[3]);

    let ambient_celsius = f64::from(raw_ambient) / 128.0;
    let object_celsius = object_temperature(raw_object, ambient_celsius);

    Ok(TemperatureReading {
        ambient_celsius,
        object_celsius,
    })
}

fn raw_sample(low: u8, high: u8) -> i32 {
    i32::from(low) + (i32::from(high as i8) << 8)
}

/// TMP006 calibration, per the sensor's datasheet.
fn object_temperature(raw_object: i32, ambient_celsius: f64) -> f64 {
    let t_die2 = ambient_celsius + 273.15;

    let s0 = 6.4e-14;
    let a1 = 1.75e-3;
    let a2 = -1.678e-5;
    let b0 = -2.94e-5;
    let b1 = -5.7e-7;
    let b2 = 4.63e-9;
    let c2 = 13.4;
    let t_ref = 298.15;

    let s = s0 * (1.0 + a1 * (t_die2 - t_ref) + a2 * (t_die2 - t_ref).powi(2));
    let v_obj2 = f64::from(raw_object) * 156.25e-9;
    let v_os = b0 + b1 * (t_die2 - t_ref) + b2 * (t_die2 - t_ref).powi(2);
    let f_obj = (v_obj2 - v_os) + c2 * (v_obj2 - v_os).powi(2);
    let t_obj = (t_die2.powi(4) + f_obj / s).powf(0.25);

    t_obj - 273.15
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn all_zero_sample_reads_zero_ambient() {
        let reading = decode_temperature(&[0x00, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(reading.ambient_celsius, 0.0);
    }

    #[test]
    fn ambient_is_raw_over_128() {
        // 0x0C80 = 3200, 3200 / 128 = 25 C.
        let reading = decode_temperature(&[0x00, 0x00, 0x80, 0x0C]).unwrap();
        assert_eq!(reading.ambient_celsius, 25.0);

        // Negative die temperatures come through the sign extension.
        let reading = decode_temperature(&[0x00, 0x00, 0x80, 0xFF]).unwrap();
        assert_eq!(reading.ambient_celsius, -1.0);
    }

    #[test]
    fn zero_object_voltage_reads_near_ambient() {
        let reading = decode_temperature(&[0x00, 0x00, 0x80, 0x0C]).unwrap();
        // V_os is nonzero at 25 C so the object estimate is close to, not
        // exactly, the die temperature.
        assert!((reading.object_celsius - reading.ambient_celsius).abs() < 5.0);
    }

    #[test]
    fn decoding_is_deterministic() {
        let sample = [0x54, 0x01, 0x60, 0x0D];
        assert_eq!(
            decode_temperature(&sample).unwrap(),
            decode_temperature(&sample).unwrap()
        );
    }

    #[test]
    fn undersized_samples_are_rejected() {
        assert_eq!(
            decode_temperature(&[0x00, 0x00, 0x80]),
            Err(Error::Truncated("temperature sample"))
        );
        assert_eq!(
            decode_temperature(&[]),
            Err(Error::Truncated("temperature sample"))
        );
    }

    #[test]
    fn extra_trailing_bytes_are_ignored() {
        let short = decode_temperature(&[0x54, 0x01, 0x60, 0x0D]).unwrap();
        let long = decode_temperature(&[0x54, 0x01, 0x60, 0x0D, 0xAA, 0xBB]).unwrap();
        assert_eq!(short, long);
    }
}
