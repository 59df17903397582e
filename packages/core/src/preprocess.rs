//! Image decoding and tensor preparation
//!
//! The deployed classifier normalizes internally, so pixels stay in the raw
//! `0..=255` range here.

use crate::config::InputSize;
use crate::error::ClassifyError;
use image::{DynamicImage, RgbImage, imageops, imageops::FilterType};
use ndarray::{Array4, ArrayView4};

/// Fixed shape `[1, height, width, 3]` float tensor in NHWC layout
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    data: Array4<f32>,
}

impl ImageTensor {
    /// Wrap an existing array, rejecting anything that is not `[1, H, W, 3]`
    pub fn from_array(data: Array4<f32>) -> Option<Self> {
        let nhwc = data.shape()[0] == 1 && data.shape()[3] == 3;
        nhwc.then_some(Self { data })
    }

    /// All-zero tensor, used to warm up a freshly loaded classifier
    pub fn zeros(size: InputSize) -> Self {
        Self {
            data: Array4::zeros((1, size.height as usize, size.width as usize, 3)),
        }
    }

    pub fn size(&self) -> InputSize {
        let shape = self.data.shape();
        InputSize::new(shape[1] as u32, shape[2] as u32)
    }

    pub fn shape(&self) -> [usize; 4] {
        let s = self.data.shape();
        [s[0], s[1], s[2], s[3]]
    }

    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.data.view()
    }
}

/// Decode uploaded bytes, sniffing the format from content
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, ClassifyError> {
    if bytes.is_empty() {
        return Err(ClassifyError::InvalidImage("empty upload".to_string()));
    }
    Ok(image::load_from_memory(bytes)?)
}

/// Convert an arbitrary bitmap into the classifier input tensor
pub fn preprocess(image: &DynamicImage, size: InputSize) -> ImageTensor {
    let rgb = image.to_rgb8();
    let resized = resize_rgb(rgb, size);

    let (w, h) = (size.width as usize, size.height as usize);
    let data = Array4::<f32>::from_shape_fn((1, h, w, 3), |(_, y, x, c)| {
        resized.get_pixel(x as u32, y as u32).0[c] as f32
    });

    ImageTensor { data }
}

fn resize_rgb(rgb: RgbImage, size: InputSize) -> RgbImage {
    if rgb.dimensions() == (size.width, size.height) {
        return rgb;
    }
    // bicubic
    imageops::resize(&rgb, size.width, size.height, FilterType::CatmullRom)
}
