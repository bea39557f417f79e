//! Extracted page content: word tokens and image assets.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::Rect;

/// A word-level unit of text with its bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// The word as extracted
    pub text: String,
    /// Bounding box in page coordinates
    pub bbox: Rect,
}

impl Token {
    pub fn new(text: impl Into<String>, bbox: Rect) -> Self {
        Self {
            text: text.into(),
            bbox,
        }
    }
}

/// Identity of an embedded image.
///
/// Two assets are the same only when their identities are equal; no
/// perceptual or content hashing is involved. For PDF input this is the
/// object number of the image XObject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// An embedded image placed on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub bbox: Rect,
}

impl Asset {
    pub fn new(id: impl Into<AssetId>, bbox: Rect) -> Self {
        Self {
            id: id.into(),
            bbox,
        }
    }
}

/// The set of assets on one page, keyed by identity.
///
/// Iteration follows first-seen order. Inserting an identity that is
/// already present replaces its bounding box in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetSet {
    entries: IndexMap<AssetId, Rect>,
}

impl AssetSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an asset; a repeated identity keeps the latest box.
    pub fn insert(&mut self, asset: Asset) {
        self.entries.insert(asset.id, asset.bbox);
    }

    pub fn contains(&self, id: &AssetId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &AssetId) -> Option<&Rect> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AssetId, &Rect)> {
        self.entries.iter()
    }

    /// Assets of `self` whose identity does not occur in `other`.
    pub fn missing_from<'a>(
        &'a self,
        other: &'a AssetSet,
    ) -> impl Iterator<Item = (&'a AssetId, &'a Rect)> + 'a {
        self.entries.iter().filter(move |(id, _)| !other.contains(id))
    }
}

impl FromIterator<Asset> for AssetSet {
    fn from_iter<I: IntoIterator<Item = Asset>>(iter: I) -> Self {
        let mut set = AssetSet::new();
        for asset in iter {
            set.insert(asset);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_identity_last_box_wins() {
        let set: AssetSet = vec![
            Asset::new("img1", Rect::new(0.0, 0.0, 10.0, 10.0)),
            Asset::new("img2", Rect::new(20.0, 0.0, 30.0, 10.0)),
            Asset::new("img1", Rect::new(50.0, 50.0, 60.0, 60.0)),
        ]
        .into_iter()
        .collect();

        assert_eq!(set.len(), 2);
        assert_eq!(
            set.get(&AssetId::new("img1")),
            Some(&Rect::new(50.0, 50.0, 60.0, 60.0))
        );
        // first-seen position is kept
        let order: Vec<_> = set.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(order, vec!["img1", "img2"]);
    }

    #[test]
    fn test_missing_from() {
        let a: AssetSet = vec![
            Asset::new("logo", Rect::default()),
            Asset::new("chart", Rect::default()),
        ]
        .into_iter()
        .collect();
        let b: AssetSet = vec![Asset::new("logo", Rect::default())]
            .into_iter()
            .collect();

        let removed: Vec<_> = a.missing_from(&b).map(|(id, _)| id.as_str()).collect();
        assert_eq!(removed, vec!["chart"]);
        assert_eq!(b.missing_from(&a).count(), 0);
    }
}
