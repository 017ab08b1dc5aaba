use serde::de::{DeserializeOwned, Deserializer, Error as _};
use serde::{Deserialize, Serialize};

/// text of the one-time frame sent to every newly connected client
pub const CONNECTION_ESTABLISHED: &str = "WebSocket connection established";

/// one telemetry sample as posted by a sensor node
///
/// every signal group is optional and independent of the others.
/// decoding never fails because of one group: a group that is not an
/// object is treated as absent, a value that is not a number becomes a gap.
/// unknown top-level fields (including `message`) are ignored.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryReading {
    #[serde(default, deserialize_with = "lenient_group", skip_serializing_if = "Option::is_none")]
    pub accelerometer: Option<Accelerometer>,

    /// metallic presence level (sensor units)
    ///
    /// outer `None`: key absent. `Some(None)`: key present without a usable number.
    #[serde(default, deserialize_with = "present_number", skip_serializing_if = "Option::is_none")]
    pub metallic_presence: Option<Option<f64>>,

    #[serde(default, deserialize_with = "lenient_group", skip_serializing_if = "Option::is_none")]
    pub magnetometer: Option<Magnetometer>,

    #[serde(default, deserialize_with = "lenient_group", skip_serializing_if = "Option::is_none")]
    pub ultrasonic: Option<Ultrasonic>,
}

impl TelemetryReading {
    /// Decode one push channel frame.
    ///
    /// Anything that is a JSON object decodes; the connection notice is
    /// simply a reading without signal groups.
    pub fn decode(text: &str) -> serde_json::Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(serde_json::Error::custom("frame is not a json object"));
        }
        serde_json::from_value(value)
    }

    /// true when no signal group is present
    pub fn is_empty(&self) -> bool {
        self.accelerometer.is_none()
            && self.metallic_presence.is_none()
            && self.magnetometer.is_none()
            && self.ultrasonic.is_none()
    }
}

/// three-axis acceleration
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Accelerometer {
    #[serde(default, deserialize_with = "lenient_number")]
    pub ax: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub ay: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub az: Option<f64>,
}

/// three-axis magnetic field
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Magnetometer {
    #[serde(default, deserialize_with = "lenient_number")]
    pub mx: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub my: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub mz: Option<f64>,
}

impl Magnetometer {
    /// field strength, or None unless all three axes are present
    pub fn magnitude(&self) -> Option<f64> {
        let (x, y, z) = (self.mx?, self.my?, self.mz?);
        Some((x * x + y * y + z * z).sqrt())
    }
}

/// distance reported by the ultrasonic ranger, in meters
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Ultrasonic {
    #[serde(default, deserialize_with = "lenient_number")]
    pub distance: Option<f64>,
}

/// the notice a relay sends right after a client connects
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub message: String,
}

impl Notice {
    pub fn connection_established() -> Self {
        Self { message: CONNECTION_ESTABLISHED.to_string() }
    }
}

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_f64())
}

fn present_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Option<f64>>, D::Error> {
    lenient_number(deserializer).map(Some)
}

fn lenient_group<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if !value.is_object() {
        return Ok(None);
    }
    Ok(serde_json::from_value(value).ok())
}
