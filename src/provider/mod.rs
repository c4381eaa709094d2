pub mod cloudinary;

pub use cloudinary::{CloudinaryClient, CloudinaryConfig, SignatureAlgorithm, sign_params};
