//! Configuration
//!
//! ```TOML
//! country = 'us'
//! toddler = true
//! preference_file = '.daylight_zip'
//! timeout_secs = 60
//! port = 3000
//!
//! [geolocation]
//! mode = 'fixed'   # 'ip', 'fixed' or 'off'
//! latitude = 40.7128
//! longitude = -74.0060
//!
//! [endpoints]
//! postal = 'https://api.zippopotam.us'
//! sun = 'https://api.sunrise-sunset.org/json'
//! geolocation = 'http://ip-api.com/json/'
//! ```
//!
//! Every key is optional.

use crate::geolocation::{
    FixedGeolocator, Geolocator, IpGeolocator, Unsupported, DEFAULT_GEOLOCATION_API,
};
use crate::location::{Coordinates, ZippopotamClient, DEFAULT_POSTAL_API};
use crate::preference::{
    MemoryPreference, PreferenceStore, TomlPreference, DEFAULT_PREFERENCE_FILE,
};
use crate::schedule::Variant;
use crate::sun::{SunriseSunsetClient, DEFAULT_SUN_API};
use crate::view::Services;
use log::warn;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "daylight.toml";
const DEFAULT_COUNTRY: &str = "us";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GeolocationMode {
    #[default]
    Ip,
    Fixed,
    Off,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct GeolocationConfig {
    pub mode: GeolocationMode,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Endpoints {
    pub postal: String,
    pub sun: String,
    pub geolocation: String,
}

impl Default for Endpoints {
    fn default() -> Endpoints {
        Endpoints {
            postal: DEFAULT_POSTAL_API.to_string(),
            sun: DEFAULT_SUN_API.to_string(),
            geolocation: DEFAULT_GEOLOCATION_API.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Country the postal codes belong to
    pub country: String,
    /// Add a toddler bedtime to the schedule
    pub toddler: bool,
    pub preference_file: PathBuf,
    /// HTTP request timeout [s]
    pub timeout_secs: u64,
    pub port: u16,
    pub geolocation: GeolocationConfig,
    pub endpoints: Endpoints,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            country: DEFAULT_COUNTRY.to_string(),
            toddler: false,
            preference_file: PathBuf::from(DEFAULT_PREFERENCE_FILE),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            port: DEFAULT_PORT,
            geolocation: GeolocationConfig::default(),
            endpoints: Endpoints::default(),
        }
    }
}

impl Config {
    /// Read configuration from TOML file, defaults when the file does not exist
    pub fn read(filename: &Path) -> Result<Config, String> {
        if !filename.exists() {
            return Ok(Config::default());
        }
        let config_file = match fs::read_to_string(filename) {
            Ok(c) => c,
            Err(why) => return Err(format!("{}: {}", filename.display(), why)),
        };
        match toml::de::from_str(&config_file) {
            Ok(c) => Ok(c),
            Err(why) => Err(format!("{}: {}", filename.display(), why)),
        }
    }

    pub fn variant(&self) -> Variant {
        Variant::from_toddler(self.toddler)
    }

    fn client(&self) -> Result<reqwest::Client, String> {
        reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|why| why.to_string())
    }

    fn geolocator(&self, client: &reqwest::Client) -> Box<dyn Geolocator> {
        let geo = &self.geolocation;
        match geo.mode {
            GeolocationMode::Ip => Box::new(IpGeolocator::new(
                client.clone(),
                &self.endpoints.geolocation,
            )),
            GeolocationMode::Fixed => match (geo.latitude, geo.longitude) {
                (Some(latitude), Some(longitude)) => Box::new(FixedGeolocator(Coordinates {
                    latitude,
                    longitude,
                })),
                _ => {
                    warn!("fixed geolocation needs both latitude and longitude");
                    Box::new(Unsupported)
                }
            },
            GeolocationMode::Off => Box::new(Unsupported),
        }
    }

    /// Build the collaborators of a view.
    ///
    /// With `persist` false the postal code is only kept in memory.
    pub fn services(&self, persist: bool) -> Result<Services, String> {
        let client = self.client()?;
        let preference: Box<dyn PreferenceStore> = if persist {
            Box::new(TomlPreference::new(&self.preference_file))
        } else {
            Box::new(MemoryPreference::new())
        };
        Ok(Services {
            geolocator: self.geolocator(&client),
            lookup: Box::new(ZippopotamClient::new(
                client.clone(),
                &self.endpoints.postal,
                &self.country,
            )),
            sun: Box::new(SunriseSunsetClient::new(client, &self.endpoints.sun)),
            preference,
        })
    }
}

#[test]
fn default_config_test() {
    let config = Config::read(Path::new("no/such/daylight.toml")).unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.variant(), Variant::Adult);
    assert_eq!(config.endpoints.sun, DEFAULT_SUN_API);
}

#[test]
fn read_config_test() {
    use tempfile::tempdir;

    let dir = tempdir().unwrap();
    let file = dir.path().join("daylight.toml");
    fs::write(
        &file,
        r#"
toddler = true
timeout_secs = 5

[geolocation]
mode = 'fixed'
latitude = 40.7128
longitude = -74.006

[endpoints]
sun = 'http://localhost:8080/json'
"#,
    )
    .unwrap();
    match Config::read(&file) {
        Ok(c) => {
            assert_eq!(c.variant(), Variant::WithToddler);
            assert_eq!(c.timeout_secs, 5);
            assert_eq!(c.country, DEFAULT_COUNTRY);
            assert_eq!(c.geolocation.mode, GeolocationMode::Fixed);
            assert_eq!(c.geolocation.latitude, Some(40.7128));
            assert_eq!(c.endpoints.sun, "http://localhost:8080/json");
            assert_eq!(c.endpoints.postal, DEFAULT_POSTAL_API);
            assert!(c.services(false).is_ok());
        }
        Err(why) => assert!(false, "{}", why),
    }
}

#[test]
fn bad_config_test() {
    use tempfile::tempdir;

    let dir = tempdir().unwrap();
    let file = dir.path().join("daylight.toml");
    fs::write(&file, "[geolocation]\nmode = 'gps'\n").unwrap();
    assert!(Config::read(&file).is_err());
}

#[tokio::test]
async fn fixed_without_coordinates_test() {
    let mut config = Config::default();
    config.geolocation.mode = GeolocationMode::Fixed;
    config.geolocation.latitude = Some(1.0);
    let client = reqwest::Client::new();
    assert!(config.geolocator(&client).locate().await.is_err());
}
