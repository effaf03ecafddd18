use std::{fmt, io::Cursor, sync::Arc};

use anyhow::{Context, Result};
use image::{ImageFormat, RgbaImage};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Shared, immutable RGBA bitmap.
///
/// Cloning is cheap; snapshots of the navigation state share the same pixels.
/// On the wire a bitmap travels as PNG bytes.
#[derive(Clone)]
pub struct Bitmap(Arc<RgbaImage>);

impl Bitmap {
    pub fn new(image: RgbaImage) -> Self {
        Self(Arc::new(image))
    }

    pub fn from_png(png_bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory_with_format(png_bytes, ImageFormat::Png)
            .context("failed to decode PNG bitmap")?;
        Ok(Self::new(image.to_rgba8()))
    }

    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.0
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .context("failed to encode PNG bitmap")?;
        Ok(bytes)
    }

    pub fn image(&self) -> &RgbaImage {
        &self.0
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }
}

impl From<RgbaImage> for Bitmap {
    fn from(image: RgbaImage) -> Self {
        Self::new(image)
    }
}

impl PartialEq for Bitmap {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || *self.0 == *other.0
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bitmap({}x{})", self.width(), self.height())
    }
}

impl Serialize for Bitmap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let bytes = self.to_png().map_err(serde::ser::Error::custom)?;
        serializer.serialize_bytes(&bytes)
    }
}

impl<'de> Deserialize<'de> for Bitmap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        Bitmap::from_png(&bytes).map_err(|err| de::Error::custom(format!("{err:#}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_png_bytes_survive_json() {
        let mut image = RgbaImage::new(4, 3);
        image.put_pixel(1, 2, Rgba([10, 20, 30, 200]));
        let bitmap = Bitmap::new(image);

        let json = serde_json::to_string(&bitmap).unwrap();
        let decoded: Bitmap = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded, bitmap);
        assert_eq!(format!("{:?}", decoded), "Bitmap(4x3)");
    }

    #[test]
    fn test_garbage_bytes_are_rejected() {
        let result: Result<Bitmap, _> = serde_json::from_str("[1, 2, 3]");
        assert!(result.is_err());
    }
}
