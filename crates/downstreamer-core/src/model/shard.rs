use crate::error::{Error, Result};
use core::{fmt, str::FromStr};
use serde::{Deserialize, Serialize};

/// A single partition of a query's data scope: shard `shard` out of `of`.
///
/// Encodes to the compact `"<shard>_of_<of>"` token embedded in downstream
/// requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Shard {
    pub shard: u32,
    pub of: u32,
}

impl Shard {
    pub const fn new(shard: u32, of: u32) -> Self {
        Self { shard, of }
    }
}

impl fmt::Display for Shard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_of_{}", self.shard, self.of)
    }
}

impl FromStr for Shard {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidShard {
            input: s.to_string(),
        };

        let (shard, of) = s.split_once("_of_").ok_or_else(invalid)?;
        let shard: u32 = shard.parse().map_err(|_| invalid())?;
        let of: u32 = of.parse().map_err(|_| invalid())?;

        if of == 0 || shard >= of {
            return Err(invalid());
        }

        Ok(Self { shard, of })
    }
}

/// An ordered set of [`Shard`]s. Empty means unsharded execution.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shards(Vec<Shard>);

impl Shards {
    pub const fn none() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Shard> {
        self.0.iter()
    }

    /// Stable, lossless string encoding, one token per shard in order.
    pub fn encode(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }

    /// Inverse of [`Shards::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidShard`] for the first token that does not
    /// parse.
    pub fn parse<S: AsRef<str>>(encoded: &[S]) -> Result<Self> {
        encoded
            .iter()
            .map(|s| s.as_ref().parse())
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }
}

impl From<Vec<Shard>> for Shards {
    fn from(shards: Vec<Shard>) -> Self {
        Self(shards)
    }
}

impl FromIterator<Shard> for Shards {
    fn from_iter<I: IntoIterator<Item = Shard>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Shards {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, shard) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{shard}")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_in_order() {
        let shards: Shards = vec![Shard::new(3, 16), Shard::new(0, 16)].into();
        assert_eq!(shards.encode(), vec!["3_of_16", "0_of_16"]);
        assert_eq!(shards.to_string(), "[3_of_16 0_of_16]");
    }

    #[test]
    fn parse_recovers_encoding() {
        let shards: Shards = (0..4).map(|i| Shard::new(i, 4)).collect();
        let encoded = shards.encode();
        assert_eq!(Shards::parse(&encoded).unwrap(), shards);
    }

    #[test]
    fn empty_set_encodes_to_nothing() {
        assert!(Shards::none().encode().is_empty());
        assert!(Shards::parse::<&str>(&[]).unwrap().is_empty());
    }

    #[test]
    fn rejects_malformed_shards() {
        for input in ["", "1", "1_of_", "_of_2", "2_of_2", "1_of_0", "a_of_b", "1-of-2"] {
            let err = input.parse::<Shard>().unwrap_err();
            assert!(
                matches!(err, Error::InvalidShard { .. }),
                "unexpected error for {input:?}: {err}"
            );
        }
    }
}
