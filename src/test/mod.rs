//! Shared functionality for unit tests: crafted metadata blobs and registration images.

pub mod builder;

use crate::metadata::{
    decoder::{decode, MetadataSet},
    version::VersionPair,
};
use builder::{BuiltImage, ImageBuilder, MetadataBuilder};

/// A metadata blob together with the native image holding its registration tables.
pub struct Fixture {
    pub pair: VersionPair,
    pub metadata: Vec<u8>,
    pub image: BuiltImage,
}

impl Fixture {
    pub fn new(pair: VersionPair, metadata: MetadataBuilder, image: ImageBuilder) -> Self {
        Fixture {
            pair,
            metadata: metadata.build(),
            image: image.build(),
        }
    }

    /// Decodes the blob with the fixture's version pair
    pub fn decode(&self) -> MetadataSet<'_> {
        decode(&self.metadata, self.image.source(), self.pair).unwrap()
    }
}
