use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::iter::FusedIterator;
use core::ops::Index;

use crate::DefaultHashBuilder;
use crate::TryReserveError;
use crate::hash_table::Entry as TableEntry;
use crate::hash_table::HashTable;

/// A hash map implemented with Robin Hood linear probing on top of
/// [`HashTable`].
///
/// `HashMap<K, V, S>` stores key-value pairs where keys implement `Hash + Eq`
/// and uses a configurable hasher builder `S` to hash keys. Every entry keeps
/// its full hash next to the key, so growing the map never rehashes keys.
///
/// Iteration order is the slot order of the underlying table. It is
/// unspecified and changes with any insertion or removal.
///
/// # Performance Characteristics
///
/// - **Memory**: a `u64` hash and an occupancy flag per slot, plus the size of
///   `(K, V)`; at most 85% of slots are in use.
/// - **Lookups**: misses terminate as soon as the probe meets an entry closer
///   to its home slot than the probe itself.
/// - **Removal**: no tombstones, so long-lived maps with heavy churn do not
///   degrade.
///
/// # Examples
///
/// ```rust
/// # use robin_hood_map::HashMap;
/// #
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// struct Coord {
///     x: i32,
///     y: i32,
/// }
///
/// let mut terrain: HashMap<Coord, char> = HashMap::new();
/// terrain.insert_or_update(Coord { x: 0, y: 0 }, '.');
/// terrain.insert_or_update(Coord { x: -5, y: 3 }, '#');
///
/// assert_eq!(terrain.find(&Coord { x: -5, y: 3 }), Some(&'#'));
/// assert_eq!(terrain.count(&Coord { x: 1, y: 1 }), 0);
/// assert!(terrain.erase(&Coord { x: 0, y: 0 }));
/// assert_eq!(terrain.size(), 1);
/// ```
#[derive(Clone)]
pub struct HashMap<K, V, S = DefaultHashBuilder> {
    table: HashTable<(K, V)>,
    hash_builder: S,
}

impl<K, V, S> Debug for HashMap<K, V, S>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S> HashMap<K, V, S> {
    /// Returns the number of elements in the map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use robin_hood_map::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let mut map = HashMap::with_hasher(SimpleHasher);
    /// assert_eq!(map.len(), 0);
    /// map.insert(1, "a");
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Alias of [`len`](Self::len).
    pub fn size(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no elements.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of elements the map can hold before it grows.
    ///
    /// This is 85% of the slot count, rounded down.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use robin_hood_map::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let map: HashMap<i32, i32, _> = HashMap::with_capacity_and_hasher(0, SimpleHasher);
    /// assert_eq!(map.capacity(), 6);
    /// ```
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns a reference to the map's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Removes all elements, keeping the allocated slots.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// An iterator visiting all key-value pairs in slot order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use robin_hood_map::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let mut map = HashMap::with_hasher(SimpleHasher);
    /// map.insert("a", 1);
    /// map.insert("b", 2);
    ///
    /// let mut pairs: Vec<_> = map.iter().collect();
    /// pairs.sort();
    /// assert_eq!(pairs, [(&"a", &1), (&"b", &2)]);
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// An iterator visiting all key-value pairs with mutable references to
    /// the values. Keys stay immutable.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use robin_hood_map::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let mut map = HashMap::with_hasher(SimpleHasher);
    /// map.insert(1, 10);
    /// map.insert(2, 20);
    ///
    /// for (_, value) in map.iter_mut() {
    ///     *value += 1;
    /// }
    /// assert_eq!(map.get(&1), Some(&11));
    /// assert_eq!(map.get(&2), Some(&21));
    /// ```
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            inner: self.table.iter_mut(),
        }
    }

    /// An iterator visiting all keys in slot order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// An iterator visiting all values in slot order.
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// An iterator visiting all values mutably in slot order.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    /// Clears the map, returning all key-value pairs as an iterator.
    ///
    /// The allocation is kept. Pairs the caller does not consume are dropped
    /// together with the iterator.
    pub fn drain(&mut self) -> Drain<'_, K, V> {
        Drain {
            inner: self.table.drain(),
        }
    }

    /// Retains only the entries for which `f` returns `true`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use robin_hood_map::HashMap;
    /// #
    /// let mut map: HashMap<i32, i32> = (0..8).map(|x| (x, x * 10)).collect();
    /// map.retain(|&k, _| k % 2 == 0);
    /// assert_eq!(map.len(), 4);
    /// ```
    pub fn retain(&mut self, mut f: impl FnMut(&K, &mut V) -> bool) {
        self.table.retain(|(k, v)| f(&*k, v));
    }

    /// Count of stored entries per probe sequence length.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> crate::hash_table::ProbeHistogram {
        self.table.probe_histogram()
    }

    /// Occupancy, probe length, and memory statistics of the underlying table.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> crate::hash_table::DebugStats {
        self.table.debug_stats()
    }

    #[cfg(test)]
    pub(crate) fn raw_table(&self) -> &HashTable<(K, V)> {
        &self.table
    }
}

impl<K, V, S> HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Creates a new hash map with the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use robin_hood_map::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let map: HashMap<i32, String, _> = HashMap::with_hasher(SimpleHasher);
    /// assert!(map.is_empty());
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_capacity_and_hasher(0, hash_builder)
    }

    /// Creates a new hash map with room for at least `capacity` slots.
    ///
    /// The slot count is rounded up to a power of two no smaller than 8, and
    /// the map grows once 85% of those slots are in use.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use robin_hood_map::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let map: HashMap<i32, String, _> = HashMap::with_capacity_and_hasher(100, SimpleHasher);
    /// assert!(map.capacity() >= 100);
    /// ```
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            table: HashTable::with_capacity(capacity),
            hash_builder,
        }
    }

    /// Fallible version of
    /// [`with_capacity_and_hasher`](Self::with_capacity_and_hasher).
    ///
    /// # Errors
    ///
    /// Returns [`TryReserveError`] if the slot array cannot be sized or
    /// allocated.
    pub fn try_with_capacity_and_hasher(
        capacity: usize,
        hash_builder: S,
    ) -> Result<Self, TryReserveError> {
        Ok(Self {
            table: HashTable::try_with_capacity(capacity)?,
            hash_builder,
        })
    }

    #[inline]
    fn hash_key(&self, key: &K) -> u64 {
        self.hash_builder.hash_one(key)
    }

    /// Shrinks the map's allocation as much as the load threshold allows.
    pub fn shrink_to_fit(&mut self) {
        self.table.shrink_to_fit();
    }

    /// Reserves capacity for at least `additional` more elements.
    ///
    /// # Panics
    ///
    /// Panics if the new allocation size overflows `usize`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use robin_hood_map::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let mut map: HashMap<i32, i32, _> = HashMap::with_hasher(SimpleHasher);
    /// map.reserve(1000);
    /// assert!(map.capacity() >= 1000);
    /// ```
    pub fn reserve(&mut self, additional: usize) {
        self.table.reserve(additional);
    }

    /// Tries to reserve capacity for at least `additional` more elements.
    ///
    /// # Errors
    ///
    /// Returns [`TryReserveError`] if the capacity overflows or the allocator
    /// fails. The map is unchanged in that case.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        self.table.try_reserve(additional)
    }

    /// Inserts `value` under `key`, or overwrites the value already stored
    /// under an equal key, and returns a mutable reference to the stored
    /// value.
    ///
    /// When the key is already present only the value is replaced; the stored
    /// key is kept.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use robin_hood_map::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let mut map = HashMap::with_hasher(SimpleHasher);
    /// map.insert_or_update((0, 0), 1);
    /// *map.insert_or_update((0, 0), 2) += 40;
    ///
    /// assert_eq!(map.find(&(0, 0)), Some(&42));
    /// assert_eq!(map.size(), 1);
    /// ```
    pub fn insert_or_update(&mut self, key: K, value: V) -> &mut V {
        let hash = self.hash_key(&key);
        Self::store(self.table.entry(hash, |(k, _)| k == &key), key, value)
    }

    /// Fallible version of [`insert_or_update`](Self::insert_or_update).
    ///
    /// # Errors
    ///
    /// Returns [`TryReserveError`] if the map had to grow and could not. The
    /// map is unchanged and `key` and `value` are dropped.
    pub fn try_insert_or_update(&mut self, key: K, value: V) -> Result<&mut V, TryReserveError> {
        let hash = self.hash_key(&key);
        let entry = self.table.try_entry(hash, |(k, _)| k == &key)?;
        Ok(Self::store(entry, key, value))
    }

    fn store(entry: TableEntry<'_, (K, V)>, key: K, value: V) -> &mut V {
        match entry {
            TableEntry::Occupied(entry) => {
                let slot = entry.into_mut();
                slot.1 = value;
                &mut slot.1
            }
            TableEntry::Vacant(entry) => &mut entry.insert((key, value)).1,
        }
    }

    /// Inserts a key-value pair into the map.
    ///
    /// If the map did not have this key present, `None` is returned. If it
    /// did, the value is updated and the old value is returned.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use robin_hood_map::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let mut map = HashMap::with_hasher(SimpleHasher);
    /// assert_eq!(map.insert(37, "a"), None);
    /// assert_eq!(map.is_empty(), false);
    ///
    /// map.insert(37, "b");
    /// assert_eq!(map.insert(37, "c"), Some("b"));
    /// assert_eq!(map.get(&37), Some(&"c"));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let hash = self.hash_key(&key);
        match self.table.entry(hash, |(k, _)| k == &key) {
            TableEntry::Occupied(mut entry) => {
                Some(core::mem::replace(&mut entry.get_mut().1, value))
            }
            TableEntry::Vacant(entry) => {
                entry.insert((key, value));
                None
            }
        }
    }

    /// Returns a reference to the value corresponding to the key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use robin_hood_map::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let mut map = HashMap::with_hasher(SimpleHasher);
    /// map.insert(1, "a");
    /// assert_eq!(map.get(&1), Some(&"a"));
    /// assert_eq!(map.get(&2), None);
    /// ```
    pub fn get(&self, key: &K) -> Option<&V> {
        let hash = self.hash_key(key);
        self.table.find(hash, |(k, _)| k == key).map(|(_, v)| v)
    }

    /// Alias of [`get`](Self::get).
    pub fn find(&self, key: &K) -> Option<&V> {
        self.get(key)
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let hash = self.hash_key(key);
        self.table.find_mut(hash, |(k, _)| k == key).map(|(_, v)| v)
    }

    /// Alias of [`get_mut`](Self::get_mut).
    pub fn find_mut(&mut self, key: &K) -> Option<&mut V> {
        self.get_mut(key)
    }

    /// Returns the stored key and its value.
    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        let hash = self.hash_key(key);
        self.table.find(hash, |(k, _)| k == key).map(|(k, v)| (k, v))
    }

    /// Returns `true` if the map contains a value for the specified key.
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Number of entries stored under `key`: 0 or 1.
    pub fn count(&self, key: &K) -> usize {
        usize::from(self.contains_key(key))
    }

    /// Removes a key from the map, returning the value if it was present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use robin_hood_map::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let mut map = HashMap::with_hasher(SimpleHasher);
    /// map.insert(1, "a");
    /// assert_eq!(map.remove(&1), Some("a"));
    /// assert_eq!(map.remove(&1), None);
    /// ```
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Removes a key from the map, returning the stored key and value.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        let hash = self.hash_key(key);
        self.table.remove(hash, |(k, _)| k == key)
    }

    /// Removes `key` and reports whether it was present.
    pub fn erase(&mut self, key: &K) -> bool {
        self.remove_entry(key).is_some()
    }

    /// Gets the given key's corresponding entry in the map for in-place
    /// manipulation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use robin_hood_map::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let mut letters = HashMap::with_hasher(SimpleHasher);
    ///
    /// for ch in "a short treatise on fungi".chars() {
    ///     letters.entry(ch).and_modify(|counter| *counter += 1).or_insert(1);
    /// }
    ///
    /// assert_eq!(letters[&'s'], 2);
    /// assert_eq!(letters[&'t'], 3);
    /// assert_eq!(letters.get(&'y'), None);
    /// ```
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V> {
        let hash = self.hash_key(&key);
        match self.table.entry(hash, |(k, _)| k == &key) {
            TableEntry::Occupied(entry) => Entry::Occupied(OccupiedEntry { entry }),
            TableEntry::Vacant(entry) => Entry::Vacant(VacantEntry { entry, key }),
        }
    }

    /// Returns the value stored under `key`, inserting `V::default()` first if
    /// the key is absent.
    pub fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.entry(key).or_default()
    }
}

impl<K, V, S> HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    /// Creates a new hash map using the default hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use robin_hood_map::HashMap;
    /// #
    /// # #[derive(Default)]
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let map: HashMap<i32, String, SimpleHasher> = HashMap::new();
    /// assert!(map.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates a new hash map with the specified capacity using the default
    /// hasher builder.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, S::default())
    }
}

impl<K, V, S> Default for HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> PartialEq for HashMap<K, V, S>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key).is_some_and(|v| *value == *v))
    }
}

impl<K, V, S> Eq for HashMap<K, V, S>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
{
}

impl<K, V, S> Index<&K> for HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    type Output = V;

    /// Returns a reference to the value under `key`.
    ///
    /// # Panics
    ///
    /// Panics if the key is not present in the map.
    fn index(&self, key: &K) -> &V {
        match self.get(key) {
            Some(value) => value,
            None => panic!("key not found in HashMap"),
        }
    }
}

impl<K, V, S> Extend<(K, V)> for HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        // Keys may already be present in a populated map; reserve for half.
        let reserve = if self.is_empty() {
            iter.size_hint().0
        } else {
            iter.size_hint().0.div_ceil(2)
        };
        self.reserve(reserve);

        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K, V, S> IntoIterator for HashMap<K, V, S> {
    type IntoIter = IntoIter<K, V>;
    type Item = (K, V);

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

impl<'a, K, V, S> IntoIterator for &'a HashMap<K, V, S> {
    type IntoIter = Iter<'a, K, V>;
    type Item = (&'a K, &'a V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a mut HashMap<K, V, S> {
    type IntoIter = IterMut<'a, K, V>;
    type Item = (&'a K, &'a mut V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

/// A view into a single entry in the map, which may either be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashMap`].
///
/// [`entry`]: HashMap::entry
pub enum Entry<'a, K, V> {
    /// A vacant entry.
    Vacant(VacantEntry<'a, K, V>),
    /// An occupied entry.
    Occupied(OccupiedEntry<'a, K, V>),
}

impl<'a, K, V> Entry<'a, K, V> {
    /// Inserts a default value if the entry is vacant and returns a mutable
    /// reference.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts a value computed from a closure if the entry is vacant and
    /// returns a mutable reference.
    pub fn or_insert_with<F>(self, default: F) -> &'a mut V
    where
        F: FnOnce() -> V,
    {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Provides in-place mutable access to an occupied entry before any
    /// potential inserts.
    pub fn and_modify<F>(self, f: F) -> Self
    where
        F: FnOnce(&mut V),
    {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }

    /// Returns a reference to this entry's key.
    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(entry) => entry.key(),
            Entry::Vacant(entry) => entry.key(),
        }
    }
}

impl<'a, K, V> Entry<'a, K, V>
where
    V: Default,
{
    /// Inserts the default value if the entry is vacant and returns a mutable
    /// reference.
    pub fn or_default(self) -> &'a mut V {
        self.or_insert_with(Default::default)
    }
}

/// A view into a vacant entry in the map.
pub struct VacantEntry<'a, K, V> {
    entry: crate::hash_table::VacantEntry<'a, (K, V)>,
    key: K,
}

impl<'a, K, V> VacantEntry<'a, K, V> {
    /// Gets a reference to the key that would be used when inserting a value.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Take ownership of the key.
    pub fn into_key(self) -> K {
        self.key
    }

    /// Inserts the value into the map and returns a mutable reference to it.
    pub fn insert(self, value: V) -> &'a mut V {
        &mut self.entry.insert((self.key, value)).1
    }
}

/// A view into an occupied entry in the map.
pub struct OccupiedEntry<'a, K, V> {
    entry: crate::hash_table::OccupiedEntry<'a, (K, V)>,
}

impl<'a, K, V> OccupiedEntry<'a, K, V> {
    /// Gets a reference to the key in the entry.
    pub fn key(&self) -> &K {
        &self.entry.get().0
    }

    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        &self.entry.get().1
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        &mut self.entry.get_mut().1
    }

    /// Converts the entry into a mutable reference to the value.
    pub fn into_mut(self) -> &'a mut V {
        &mut self.entry.into_mut().1
    }

    /// Inserts a value into the entry and returns the old value.
    pub fn insert(&mut self, value: V) -> V {
        core::mem::replace(&mut self.entry.get_mut().1, value)
    }

    /// Removes the entry from the map and returns the value.
    pub fn remove(self) -> V {
        self.entry.remove().1
    }

    /// Removes the entry from the map and returns the key and value.
    pub fn remove_entry(self) -> (K, V) {
        self.entry.remove()
    }
}

/// An iterator over the key-value pairs of a `HashMap`.
pub struct Iter<'a, K, V> {
    inner: crate::hash_table::Iter<'a, (K, V)>,
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// A mutable iterator over the key-value pairs of a `HashMap`.
pub struct IterMut<'a, K, V> {
    inner: crate::hash_table::IterMut<'a, (K, V)>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (&*k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}

/// An iterator over the keys of a `HashMap`.
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

/// An iterator over the values of a `HashMap`.
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

/// A mutable iterator over the values of a `HashMap`.
pub struct ValuesMut<'a, K, V> {
    inner: IterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}

/// A draining iterator over the key-value pairs of a `HashMap`.
pub struct Drain<'a, K, V> {
    inner: crate::hash_table::Drain<'a, (K, V)>,
}

impl<K, V> Iterator for Drain<'_, K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Drain<'_, K, V> {}

/// An owning iterator over the key-value pairs of a `HashMap`.
pub struct IntoIter<K, V> {
    inner: crate::hash_table::IntoIter<(K, V)>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::hash::BuildHasher;

    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use siphasher::sip::SipHasher;

    use super::*;

    #[derive(Clone)]
    struct SipHashBuilder {
        k1: u64,
        k2: u64,
    }

    impl BuildHasher for SipHashBuilder {
        type Hasher = SipHasher;

        fn build_hasher(&self) -> Self::Hasher {
            SipHasher::new_with_keys(self.k1, self.k2)
        }
    }

    impl Default for SipHashBuilder {
        fn default() -> Self {
            let mut rng = OsRng;
            Self {
                k1: rng.try_next_u64().unwrap_or(0),
                k2: rng.try_next_u64().unwrap_or(0),
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    struct Coord {
        x: i32,
        y: i32,
    }

    fn coord(x: i32, y: i32) -> Coord {
        Coord { x, y }
    }

    #[test]
    fn test_new_and_with_hasher() {
        let map: HashMap<i32, String, SipHashBuilder> = HashMap::new();
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);

        let map2 = HashMap::<i32, String, _>::with_hasher(SipHashBuilder::default());
        assert!(map2.is_empty());
        assert_eq!(map2.size(), 0);
        assert_eq!(map2.capacity(), 6);
    }

    #[test]
    fn test_with_capacity() {
        let map: HashMap<i32, String, SipHashBuilder> = HashMap::with_capacity(100);
        assert!(map.capacity() >= 100);
        assert!(map.is_empty());

        let map2 =
            HashMap::<i32, String, _>::with_capacity_and_hasher(200, SipHashBuilder::default());
        assert!(map2.capacity() >= 200);
        assert!(map2.is_empty());
    }

    #[test]
    fn test_try_with_capacity() {
        let map = HashMap::<i32, i32, _>::try_with_capacity_and_hasher(
            64,
            SipHashBuilder::default(),
        )
        .unwrap();
        assert_eq!(map.capacity(), 54);

        let err = HashMap::<i32, i32, _>::try_with_capacity_and_hasher(
            usize::MAX,
            SipHashBuilder::default(),
        )
        .unwrap_err();
        assert_eq!(err, TryReserveError::CapacityOverflow);
    }

    #[test]
    fn test_coord_insert_and_find() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        map.insert_or_update(coord(0, 0), 42);
        map.insert_or_update(coord(1, 2), 99);
        map.insert_or_update(coord(-5, 3), 77);

        assert_eq!(map.size(), 3);
        assert_eq!(map.find(&coord(0, 0)), Some(&42));
        assert_eq!(map.find(&coord(1, 2)), Some(&99));
        assert_eq!(map.find(&coord(-5, 3)), Some(&77));
        assert_eq!(map.count(&coord(1, 2)), 1);
        assert_eq!(map.count(&coord(9, 9)), 0);
        assert_eq!(map.find(&coord(9, 9)), None);
    }

    #[test]
    fn test_coord_overwrite() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        map.insert_or_update(coord(0, 0), 1);
        let value = map.insert_or_update(coord(0, 0), 2);
        assert_eq!(*value, 2);

        assert_eq!(map.size(), 1);
        assert_eq!(map.find(&coord(0, 0)), Some(&2));
    }

    #[test]
    fn test_coord_erase() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        map.insert_or_update(coord(0, 0), 42);
        map.insert_or_update(coord(1, 2), 99);

        assert!(map.erase(&coord(1, 2)));
        assert_eq!(map.size(), 1);
        assert_eq!(map.find(&coord(1, 2)), None);

        assert!(!map.erase(&coord(100, 100)));
        assert_eq!(map.size(), 1);
        map.raw_table().assert_invariants();
    }

    #[test]
    fn test_many_coords_grow() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        for i in 0..1000 {
            map.insert_or_update(coord(i, i * 3), i);
        }

        assert_eq!(map.size(), 1000);
        for i in 0..1000 {
            assert_eq!(map.find(&coord(i, i * 3)), Some(&i), "coord {i}");
        }
        assert!(map.capacity() >= 1000);
        map.raw_table().assert_invariants();

        assert_eq!(map.iter().count(), 1000);
    }

    #[test]
    fn test_negative_coords() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        for x in -20..=20 {
            for y in -20..=20 {
                map.insert_or_update(coord(x, y), x * 100 + y);
            }
        }

        assert_eq!(map.size(), 41 * 41);
        assert_eq!(map.find(&coord(-20, -20)), Some(&-2020));
        assert_eq!(map.find(&coord(-1, 7)), Some(&-93));
        assert_eq!(map.find(&coord(21, 0)), None);
    }

    #[test]
    fn test_empty_map_ops() {
        let mut map: HashMap<Coord, i32, _> = HashMap::with_hasher(SipHashBuilder::default());
        assert_eq!(map.find(&coord(0, 0)), None);
        assert_eq!(map.count(&coord(0, 0)), 0);
        assert!(!map.erase(&coord(0, 0)));
        assert_eq!(map.iter().next(), None);

        map.insert_or_update(coord(3, 3), 3);
        map.clear();
        assert_eq!(map.size(), 0);
        assert_eq!(map.find(&coord(3, 3)), None);
        assert_eq!(map.count(&coord(3, 3)), 0);
        assert!(!map.erase(&coord(3, 3)));
        assert_eq!(map.iter().next(), None);
    }

    #[test]
    fn test_try_insert_or_update() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        for i in 0..100 {
            *map.try_insert_or_update(i, 0).unwrap() += i;
        }
        assert_eq!(map.len(), 100);
        assert_eq!(map.get(&42), Some(&42));
    }

    #[test]
    fn test_insert_and_get() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());

        assert_eq!(map.insert(1, "hello".to_string()), None);
        assert_eq!(map.len(), 1);
        assert!(!map.is_empty());

        assert_eq!(map.get(&1), Some(&"hello".to_string()));
        assert_eq!(map.get(&2), None);

        assert_eq!(
            map.insert(1, "world".to_string()),
            Some("hello".to_string())
        );
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&1), Some(&"world".to_string()));
    }

    #[test]
    fn test_get_mut() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        map.insert(1, "hello".to_string());

        if let Some(value) = map.get_mut(&1) {
            value.push_str(" world");
        }

        assert_eq!(map.get(&1), Some(&"hello world".to_string()));
        assert_eq!(map.find_mut(&2), None);
    }

    #[test]
    fn test_get_key_value() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        map.insert("key".to_string(), 5);

        let (k, v) = map.get_key_value(&"key".to_string()).unwrap();
        assert_eq!(k, "key");
        assert_eq!(*v, 5);
        assert!(map.get_key_value(&"other".to_string()).is_none());
    }

    #[test]
    fn test_contains_key() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        assert!(!map.contains_key(&1));

        map.insert(1, "value".to_string());
        assert!(map.contains_key(&1));
        assert!(!map.contains_key(&2));
    }

    #[test]
    fn test_remove() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        map.insert(1, "hello".to_string());
        map.insert(2, "world".to_string());

        assert_eq!(map.remove(&1), Some("hello".to_string()));
        assert_eq!(map.len(), 1);
        assert!(!map.contains_key(&1));
        assert!(map.contains_key(&2));

        assert_eq!(map.remove(&1), None);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_remove_entry() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        map.insert(1, "hello".to_string());

        assert_eq!(map.remove_entry(&1), Some((1, "hello".to_string())));
        assert!(map.is_empty());
        assert_eq!(map.remove_entry(&1), None);
    }

    #[test]
    fn test_reserve() {
        let mut map: HashMap<i32, i32, _> = HashMap::with_hasher(SipHashBuilder::default());
        map.reserve(100);
        assert!(map.capacity() >= 100);

        assert_eq!(
            map.try_reserve(usize::MAX),
            Err(TryReserveError::CapacityOverflow)
        );
        assert!(map.capacity() >= 100);
    }

    #[test]
    fn test_shrink_to_fit() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        for i in 0..500 {
            map.insert(i, i);
        }
        for i in 5..500 {
            map.remove(&i);
        }

        map.shrink_to_fit();
        assert_eq!(map.capacity(), 6);
        for i in 0..5 {
            assert_eq!(map[&i], i);
        }
    }

    #[test]
    fn test_entry_api() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());

        match map.entry(1) {
            Entry::Vacant(entry) => {
                assert_eq!(entry.key(), &1);
                entry.insert("first".to_string());
            }
            Entry::Occupied(_) => panic!("Entry should be vacant"),
        }

        match map.entry(1) {
            Entry::Occupied(entry) => {
                assert_eq!(entry.key(), &1);
                assert_eq!(entry.get(), "first");
            }
            Entry::Vacant(_) => panic!("Entry should be occupied"),
        }

        let value = map.entry(2).or_insert("second".to_string());
        assert_eq!(value, "second");

        let value = map
            .entry(3)
            .or_insert_with(|| "third".to_string());
        assert_eq!(value, "third");
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_entry_or_default() {
        let mut map: HashMap<i32, Vec<i32>, _> = HashMap::with_hasher(SipHashBuilder::default());

        map.entry(1).or_default().push(42);
        map.entry(1).or_default().push(43);

        assert_eq!(map.get(&1), Some(&vec![42, 43]));
    }

    #[test]
    fn test_get_or_insert_default() {
        let mut map: HashMap<Coord, u32, _> = HashMap::with_hasher(SipHashBuilder::default());

        *map.get_or_insert_default(coord(4, 4)) += 1;
        *map.get_or_insert_default(coord(4, 4)) += 1;
        assert_eq!(*map.get_or_insert_default(coord(0, 1)), 0);

        assert_eq!(map[&coord(4, 4)], 2);
        assert_eq!(map.size(), 2);
    }

    #[test]
    fn test_occupied_entry() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        map.insert(1, "original".to_string());

        if let Entry::Occupied(mut entry) = map.entry(1) {
            assert_eq!(entry.get(), "original");
            entry.get_mut().push_str(" modified");
            assert_eq!(entry.insert("replaced".to_string()), "original modified");
        } else {
            panic!("Entry should be occupied");
        }

        assert_eq!(map.get(&1), Some(&"replaced".to_string()));

        if let Entry::Occupied(entry) = map.entry(1) {
            assert_eq!(entry.remove_entry(), (1, "replaced".to_string()));
        }
        assert!(map.is_empty());
    }

    #[test]
    fn test_vacant_entry() {
        let mut map: HashMap<i32, String, _> = HashMap::with_hasher(SipHashBuilder::default());

        if let Entry::Vacant(entry) = map.entry(7) {
            assert_eq!(entry.into_key(), 7);
        }
        assert!(map.is_empty());

        let count = map
            .entry(7)
            .and_modify(|v| v.push('!'))
            .or_insert_with(|| "seven".to_string());
        assert_eq!(count, "seven");

        map.entry(7).and_modify(|v| v.push('!')).or_default();
        assert_eq!(map[&7], "seven!");
    }

    #[test]
    fn test_iterators() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        map.insert(1, "one".to_string());
        map.insert(2, "two".to_string());
        map.insert(3, "three".to_string());

        let mut pairs: Vec<_> = map.iter().map(|(k, v)| (*k, v.clone())).collect();
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                (1, "one".to_string()),
                (2, "two".to_string()),
                (3, "three".to_string())
            ]
        );

        let mut keys: Vec<_> = map.keys().copied().collect();
        keys.sort();
        assert_eq!(keys, vec![1, 2, 3]);

        let mut values: Vec<_> = map.values().cloned().collect();
        values.sort();
        assert_eq!(values, vec!["one", "three", "two"]);

        assert_eq!(map.iter().len(), 3);
        assert_eq!(map.keys().len(), 3);
    }

    #[test]
    fn test_iter_mut_and_values_mut() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        for i in 0..50 {
            map.insert(coord(i, -i), i);
        }

        for (key, value) in map.iter_mut() {
            *value += key.x;
        }
        for value in map.values_mut() {
            *value += 1;
        }
        for (_, value) in &mut map {
            *value *= 10;
        }

        for i in 0..50 {
            assert_eq!(map[&coord(i, -i)], (2 * i + 1) * 10);
        }
    }

    #[test]
    fn test_iteration_is_complete() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        for i in 0..300 {
            map.insert(coord(i * 7 + 13, i * 3 - 500), i);
        }
        for i in (0..300).step_by(4) {
            map.erase(&coord(i * 7 + 13, i * 3 - 500));
        }

        let mut seen: Vec<_> = (&map).into_iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(seen.len(), map.size());
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), map.size());
        for (key, value) in seen {
            assert_eq!(key, coord(value * 7 + 13, value * 3 - 500));
            assert_ne!(value % 4, 0);
        }
    }

    #[test]
    fn test_drain() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        map.insert(1, "one".to_string());
        map.insert(2, "two".to_string());

        let mut drained: Vec<_> = map.drain().collect();
        drained.sort();

        assert_eq!(
            drained,
            vec![(1, "one".to_string()), (2, "two".to_string())]
        );
        assert!(map.is_empty());
        map.insert(3, "three".to_string());
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_into_iter() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        for i in 0..20 {
            map.insert(i, i.to_string());
        }

        let mut owned: Vec<(i32, String)> = map.into_iter().collect();
        owned.sort();
        assert_eq!(owned.len(), 20);
        assert_eq!(owned[19], (19, "19".to_string()));
    }

    #[test]
    fn test_collision_handling() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());

        for i in 0..100 {
            map.insert(i, i * 2);
        }

        for i in 0..100 {
            assert_eq!(map.get(&i), Some(&(i * 2)));
        }

        for i in (0..100).step_by(2) {
            assert_eq!(map.remove(&i), Some(i * 2));
        }

        for i in 0..100 {
            if i % 2 == 0 {
                assert_eq!(map.get(&i), None);
            } else {
                assert_eq!(map.get(&i), Some(&(i * 2)));
            }
        }
        map.raw_table().assert_invariants();
    }

    #[test]
    fn test_string_keys() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        map.insert("hello".to_string(), 1);
        map.insert("world".to_string(), 2);

        assert_eq!(map.get(&"hello".to_string()), Some(&1));
        assert_eq!(map.get(&"world".to_string()), Some(&2));
        assert_eq!(map.get(&"missing".to_string()), None);
    }

    #[test]
    fn test_default_trait() {
        let map: HashMap<i32, String, SipHashBuilder> = HashMap::default();
        assert!(map.is_empty());
    }

    #[test]
    fn test_clone_and_eq() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        for i in 0..40 {
            map.insert(coord(i, i), i.to_string());
        }

        let mut cloned = map.clone();
        assert_eq!(map, cloned);

        cloned.insert(coord(0, 0), "changed".to_string());
        assert_ne!(map, cloned);
        assert_eq!(map[&coord(0, 0)], "0");

        cloned.insert(coord(0, 0), "0".to_string());
        cloned.insert(coord(99, 99), "extra".to_string());
        assert_ne!(map, cloned);
    }

    #[test]
    fn test_eq_ignores_layout() {
        let hasher = SipHashBuilder::default();
        let mut a = HashMap::with_capacity_and_hasher(0, hasher.clone());
        let mut b = HashMap::with_capacity_and_hasher(1024, hasher);
        for i in 0..30 {
            a.insert(i, i);
        }
        for i in (0..30).rev() {
            b.insert(i, i);
        }
        assert_eq!(a, b);
    }

    #[test]
    fn test_extend_and_from_iter() {
        let map: HashMap<Coord, i32, SipHashBuilder> =
            (0..10).map(|i| (coord(i, 0), i)).collect();
        assert_eq!(map.len(), 10);

        let mut map = map;
        map.extend((5..15).map(|i| (coord(i, 0), -i)));
        assert_eq!(map.len(), 15);
        assert_eq!(map[&coord(4, 0)], 4);
        assert_eq!(map[&coord(5, 0)], -5);
        assert_eq!(map[&coord(14, 0)], -14);
    }

    #[test]
    #[should_panic(expected = "key not found")]
    fn test_index_missing_key_panics() {
        let map: HashMap<i32, i32, _> = HashMap::with_hasher(SipHashBuilder::default());
        let _ = map[&1];
    }

    #[test]
    fn test_debug_format() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        map.insert(1, "one");
        assert_eq!(alloc::format!("{map:?}"), r#"{1: "one"}"#);
    }

    #[test]
    fn test_complex_values() {
        #[derive(Debug, Clone, PartialEq)]
        struct ComplexValue {
            id: u32,
            name: String,
            data: Vec<i32>,
        }

        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        let value = ComplexValue {
            id: 1,
            name: "test".to_string(),
            data: vec![1, 2, 3],
        };

        map.insert("key1".to_string(), value.clone());
        assert_eq!(map.get(&"key1".to_string()), Some(&value));

        if let Some(v) = map.get_mut(&"key1".to_string()) {
            v.data.push(4);
        }

        assert_eq!(map.get(&"key1".to_string()).unwrap().data, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_deterministic_replay() {
        let hasher = SipHashBuilder::default();
        let ops: Vec<(i32, bool)> = (0..500).map(|i| ((i * 37) % 101, i % 3 != 0)).collect();

        let build = || {
            let mut map = HashMap::with_hasher(hasher.clone());
            for &(key, insert) in &ops {
                if insert {
                    map.insert_or_update(coord(key, -key), key);
                } else {
                    map.erase(&coord(key, -key));
                }
            }
            map
        };

        let a = build();
        let b = build();
        assert_eq!(a, b);

        let a_order: Vec<_> = a.keys().copied().collect();
        let b_order: Vec<_> = b.keys().copied().collect();
        assert_eq!(a_order, b_order);
    }

    #[test]
    fn test_stats_through_map() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        for i in 0..100 {
            map.insert(i, ());
        }

        let stats = map.debug_stats();
        assert_eq!(stats.populated, 100);
        assert_eq!(
            map.probe_histogram().counts.iter().sum::<usize>(),
            map.len()
        );
    }
}
