//! Types for use when configuring guildfetch modules.

use crate::*;

/// Denotes a type used to configure a specific guildfetch module.
///
/// A module config serializes to a json object with a single module-named
/// key, e.g. `{ "coreRetrieval": { ... } }`, so that many module configs
/// can share one [Config] without clashing.
///
/// Note, the types defined in this struct are specifically for configuration
/// that cannot be changed at runtime, the likes of which might be found
/// in a configuration file. Per-call options live on the module apis.
pub trait ModConfig:
    'static
    + Sized
    + Default
    + std::fmt::Debug
    + serde::Serialize
    + serde::de::DeserializeOwned
    + Send
    + Sync
{
}

/// Guildfetch configuration.
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Config(serde_json::Map<String, serde_json::Value>);

impl Config {
    /// Set a module config. The top-level keys of the module config
    /// replace any existing values under the same keys.
    ///
    /// Module factories call this with their defaults when the builder
    /// generates a default configuration.
    pub fn set_module_config<M: ModConfig>(
        &mut self,
        config: &M,
    ) -> GfResult<()> {
        match serde_json::to_value(config)
            .map_err(|e| GfError::other_src("encode module config", e))?
        {
            serde_json::Value::Object(map) => {
                self.0.extend(map);
                Ok(())
            }
            oth => Err(GfError::other(format!(
                "module config must encode to a json object, got: {oth}"
            ))),
        }
    }

    /// Get a module config. Note that this config may be loaded from
    /// disk and edited by humans, so module configs should use
    /// `#[serde(default)]` to tolerate missing properties.
    pub fn get_module_config<M: ModConfig>(&self) -> GfResult<M> {
        let map = self.0.clone();
        serde_json::from_value(serde_json::Value::Object(map))
            .map_err(|e| GfError::other_src("decode module config", e))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(
        Debug, Default, PartialEq, serde::Serialize, serde::Deserialize,
    )]
    #[serde(default, rename_all = "camelCase")]
    struct Mod1Config {
        p_a: u32,
        p_b: String,
    }

    #[derive(
        Debug, Default, PartialEq, serde::Serialize, serde::Deserialize,
    )]
    #[serde(default, rename_all = "camelCase")]
    struct Mod1ModConfig {
        mod1: Mod1Config,
    }

    impl ModConfig for Mod1ModConfig {}

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    #[serde(default, rename_all = "camelCase")]
    struct Mod2ModConfig {
        mod2_limit: u32,
    }

    impl Default for Mod2ModConfig {
        fn default() -> Self {
            Self { mod2_limit: 42 }
        }
    }

    impl ModConfig for Mod2ModConfig {}

    #[test]
    fn config_usage_example() {
        let mut config = Config::default();
        config
            .set_module_config(&Mod1ModConfig::default())
            .unwrap();
        config
            .set_module_config(&Mod2ModConfig::default())
            .unwrap();

        assert_eq!(
            r##"{
  "mod1": {
    "pA": 0,
    "pB": ""
  },
  "mod2Limit": 42
}"##,
            serde_json::to_string_pretty(&config).unwrap()
        );

        // ensure we can load a weird config from disk
        let config: Config = serde_json::from_str(
            r#"{
              "modBAD": { "foo": "bar" },
              "mod1": { "pB": "test" }
            }"#,
        )
        .unwrap();

        assert_eq!(
            Mod1ModConfig {
                mod1: Mod1Config {
                    p_a: 0,
                    p_b: "test".to_string(),
                }
            },
            config.get_module_config::<Mod1ModConfig>().unwrap(),
        );

        // unset mods get the default
        assert_eq!(
            Mod2ModConfig::default(),
            config.get_module_config::<Mod2ModConfig>().unwrap(),
        );
    }

    #[test]
    fn non_object_module_config_is_rejected() {
        #[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
        struct Scalar(u32);
        impl ModConfig for Scalar {}

        Config::default().set_module_config(&Scalar(3)).unwrap_err();
    }
}
