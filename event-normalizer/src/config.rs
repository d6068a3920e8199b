use envconfig::Envconfig;

use crate::normalize::NormalizeConfig;

#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    #[envconfig(nested = true)]
    pub normalize: NormalizeConfig,

    // Lines read from stdin before a batch is decoded
    #[envconfig(default = "100")]
    pub batch_size: usize,

    // Write new errors into the event's own `errors` list (the storage form)
    #[envconfig(default = "true")]
    pub embed_errors: bool,

    #[envconfig(default = "false")]
    pub pretty: bool,
}

impl Config {
    pub fn init_with_defaults() -> Result<Self, envconfig::Error> {
        Self::init_from_env()
    }
}
