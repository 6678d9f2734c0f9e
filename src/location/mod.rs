/// Location resolution: EXIF extraction, vision inference, geocoding,
/// and the fallback chain that combines them.

pub mod exif;
pub mod geocode;
pub mod resolver;
pub mod vision;

pub use geocode::{Geocoder, NominatimClient};
pub use resolver::{LocationResolver, Resolution, ResolveStatus};
pub use vision::{AnthropicVisionClient, AreaGuess, InferenceFailure, VisionInference};
