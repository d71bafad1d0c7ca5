pub mod apaga_luz;
pub mod client;
pub mod open_meteo;
pub mod provider;
