mod image;

pub use image::ImageRecord;
