//! Canonical key representation and the default hashing function.
//!
//! A [`Key`] is the ordered sequence of primitive values callers use to
//! address both the cache and the PubSub bus. Two keys that serialize
//! identically — including recursive sorting of map fields — hash to the
//! same [`Hash`], regardless of the order fields were constructed in.

// std
use std::{collections::BTreeMap, fmt, sync::Arc};
// crates.io
use serde::{Deserialize, Serialize};

/// One element of a [`Key`].
///
/// `Map` uses a `BTreeMap` rather than an insertion-ordered map so that
/// `{a:1,b:2}` and `{b:2,a:1}` serialize — and therefore hash — identically.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPart {
	/// UTF-8 string.
	String(String),
	/// Signed integer.
	I64(i64),
	/// Floating point number.
	F64(f64),
	/// Boolean.
	Bool(bool),
	/// Explicit null.
	Null,
	/// Ordered sequence of nested parts.
	Seq(Vec<KeyPart>),
	/// Field-sorted map of nested parts.
	Map(BTreeMap<String, KeyPart>),
}
impl From<&str> for KeyPart {
	fn from(value: &str) -> Self {
		KeyPart::String(value.to_owned())
	}
}
impl From<String> for KeyPart {
	fn from(value: String) -> Self {
		KeyPart::String(value)
	}
}
impl From<i64> for KeyPart {
	fn from(value: i64) -> Self {
		KeyPart::I64(value)
	}
}
impl From<f64> for KeyPart {
	fn from(value: f64) -> Self {
		KeyPart::F64(value)
	}
}
impl From<bool> for KeyPart {
	fn from(value: bool) -> Self {
		KeyPart::Bool(value)
	}
}

/// An ordered, immutable sequence of [`KeyPart`]s identifying a cache entry
/// and, via its hash, a PubSub topic.
pub type Key = Vec<KeyPart>;

/// Opaque, printable, cheaply-clonable identifier derived from a [`Key`].
///
/// Used directly as the underlying `CacheStore` key and as the PubSub topic
/// identifier. `Arc<str>` keeps clones into topic maps and cache keys free of
/// further allocation.
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct Hash(Arc<str>);
impl Hash {
	/// Wrap an already-computed hash string.
	pub fn new(value: impl Into<Arc<str>>) -> Self {
		Self(value.into())
	}

	/// Borrow the underlying string form.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Whether this hash's string form begins with `prefix`.
	///
	/// `deletePrefix`-style operations compare hashes as plain strings, not
	/// as structured keys. Because [`default_hash_key`] encodes a [`Key`] as
	/// a sequence of self-delimited segments, `hash(["account"])` is a true
	/// string prefix of `hash(["account", "user", 1])`: invalidating a
	/// shorter key reaches every key that extends it.
	pub fn starts_with(&self, prefix: &Hash) -> bool {
		self.0.starts_with(prefix.as_str())
	}
}
impl fmt::Display for Hash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}
impl fmt::Debug for Hash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}
impl AsRef<str> for Hash {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

/// A hashing function mapping a [`Key`] to a [`Hash`].
///
/// Stored as a trait object so `CacheManager`/`QueryContext` can accept a
/// custom hashing function without becoming generic over it.
pub type HashFn = Arc<dyn Fn(&Key) -> Hash + Send + Sync>;

/// Separator appended after every encoded key segment.
///
/// Chosen as a JSON control character: `serde_json` always escapes raw
/// control characters inside string segments as `\u001f`, so this byte
/// never appears *within* a segment's own encoding — only between segments. That
/// keeps segment boundaries unambiguous and, critically, makes the encoding
/// of a key a true string prefix of the encoding of any key that extends it.
const SEGMENT_SEP: char = '\u{1f}';

/// Canonical default hashing function: encodes each segment of the key with
/// deterministic field-key sorting (via [`KeyPart::Map`]'s `BTreeMap`) and a
/// trailing separator, then concatenates.
///
/// Distinct primitive types never collide: `KeyPart`'s serde representation
/// tags each variant, so `KeyPart::String("1")` and `KeyPart::I64(1)`
/// serialize — and hash — differently.
///
/// Prefix-preserving by construction: `hash(["account"])` is a string prefix
/// of `hash(["account", "user", 1])`, so `CacheStore::delete_prefix` and
/// `CacheManager::invalidate` reach every key that extends a shorter one.
pub fn default_hash_key(key: &Key) -> Hash {
	let mut out = String::new();

	for part in key {
		// Serialization is infallible: every `KeyPart` variant is a plain
		// data type with no custom `Serialize` impl that can fail.
		let segment = serde_json::to_string(part).expect("KeyPart serialization is infallible");

		out.push_str(&segment);
		out.push(SEGMENT_SEP);
	}

	Hash(out.into())
}

/// Build a [`HashFn`] from [`default_hash_key`], for callers that need the
/// boxed form (e.g. `CacheManager::new`).
pub fn default_hash_fn() -> HashFn {
	Arc::new(default_hash_key)
}
