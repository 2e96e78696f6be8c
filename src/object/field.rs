/// A typed, named accessor for one field of a record.
///
/// Pairs the wire key with get/set functions so the operation engine can read
/// and write fields without reflection. Declared once per field, usually as an
/// associated constant on the record type:
///
/// ```ignore
/// impl Player {
///     const SCORE: FieldRef<Player, i64> =
///         FieldRef::new("score", |r| r.score.as_ref(), |r, v| r.score = v);
/// }
/// ```
pub struct FieldRef<R, V> {
    pub key: &'static str,
    pub get: fn(&R) -> Option<&V>,
    pub set: fn(&mut R, Option<V>),
}

impl<R, V> FieldRef<R, V> {
    pub const fn new(
        key: &'static str,
        get: fn(&R) -> Option<&V>,
        set: fn(&mut R, Option<V>),
    ) -> Self {
        Self { key, get, set }
    }
}

impl<R, V> Clone for FieldRef<R, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R, V> Copy for FieldRef<R, V> {}
