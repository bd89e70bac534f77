//! The raw Robin Hood table.
//!
//! [`HashTable<T>`] owns one contiguous allocation of fixed-size slots. Every
//! slot carries the item's full 64-bit hash next to the item itself, so
//! probing, eviction, and growth never call back into user hashing code.
//!
//! Items are placed by linear probing from their *home* slot (`hash & mask`).
//! The distance from home to the slot an item actually occupies is its probe
//! sequence length (PSL). Insertion swaps the carried item with any occupant
//! whose PSL is strictly smaller ("take from the rich"), which keeps every
//! cluster sorted by home index and lets lookups stop as soon as they meet an
//! occupant that is closer to home than the probe itself. Removal shifts the
//! displaced successors back by one slot instead of leaving tombstones.

use alloc::alloc::alloc;
use alloc::alloc::dealloc;
use core::alloc::Layout;
use core::fmt::Debug;
use core::marker::PhantomData;
use core::mem::MaybeUninit;
use core::ptr::NonNull;

use crate::error::Fallibility;
use crate::error::TryReserveError;

/// Smallest number of slots a table ever allocates. Must be a power of two.
const MIN_CAPACITY: usize = 8;

/// Occupancy at which the table doubles, in percent of the slot count.
const MAX_LOAD_PERCENT: u128 = 85;

#[inline(always)]
fn target_load_factor(slot_count: usize) -> usize {
    ((slot_count as u128 * MAX_LOAD_PERCENT) / 100) as usize
}

/// Number of slots needed to hold `items` without growing.
fn slots_for_items(items: usize, fallibility: Fallibility) -> Result<usize, TryReserveError> {
    let mut slot_count = items
        .checked_mul(100)
        .map(|scaled| scaled / MAX_LOAD_PERCENT as usize + 1)
        .and_then(usize::checked_next_power_of_two)
        .ok_or_else(|| fallibility.capacity_overflow())?
        .max(MIN_CAPACITY);

    while target_load_factor(slot_count) < items {
        slot_count = slot_count
            .checked_mul(2)
            .ok_or_else(|| fallibility.capacity_overflow())?;
    }

    Ok(slot_count)
}

/// One element of the slot array.
///
/// `hash` and `occupied` are always initialized (the allocation is zeroed), so
/// slots may be viewed as `&Slot<T>` at any time. `item` is initialized exactly
/// when `occupied` is set.
#[repr(C)]
struct Slot<T> {
    hash: u64,
    occupied: bool,
    item: MaybeUninit<T>,
}

/// What a single probe step found at the slot under inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Probe {
    /// The slot is empty.
    Vacant,
    /// The slot holds the item being looked up.
    Match,
    /// The occupant sits closer to its home than the probe has travelled; it
    /// carries its own PSL.
    Evict(usize),
    /// The occupant is at least as far from home as the probe; keep going.
    Skip,
}

/// Debug statistics for hash table analysis.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of elements currently in the table
    pub populated: usize,
    /// Number of elements the table accepts before it grows
    pub capacity: usize,
    /// Total number of slots allocated
    pub total_slots: usize,
    /// Longest probe sequence among stored elements
    pub max_psl: usize,
    /// Average probe sequence length over stored elements
    pub mean_psl: f64,
    /// Load factor (populated / total_slots)
    pub load_factor: f64,
    /// Total memory in bytes used by the table
    pub total_bytes: usize,
    /// Memory in bytes held by empty slots
    pub wasted_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {}/{} ({:.2}% load factor)",
            self.populated,
            self.total_slots,
            self.load_factor * 100.0
        );
        println!("Grows after: {} elements", self.capacity);
        println!(
            "Probe lengths: max {}, mean {:.3}",
            self.max_psl, self.mean_psl
        );
        println!("Total Allocated: {} bytes", self.total_bytes);
        println!(
            "Memory: {} bytes wasted ({:.02}%)",
            self.wasted_bytes,
            if self.total_bytes == 0 {
                0.0
            } else {
                (self.wasted_bytes as f64 / self.total_bytes as f64) * 100.0
            }
        );
    }
}

/// Number of stored elements per probe sequence length.
///
/// `counts[n]` is the number of elements sitting `n` slots past their home.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeHistogram {
    /// Element counts indexed by PSL.
    pub counts: alloc::vec::Vec<usize>,
}

#[cfg(any(test, feature = "stats"))]
impl ProbeHistogram {
    /// Pretty-print the histogram as horizontal bars.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        let max = *self.counts.iter().max().unwrap_or(&0);
        if max == 0 {
            println!("probe histogram: empty");
            return;
        }

        let max_bar = 60usize;
        let total_units = max_bar * 8;
        println!(
            "probe histogram ({} entries):",
            self.counts.iter().sum::<usize>()
        );

        let make_bar = |count: usize| -> alloc::string::String {
            if count == 0 {
                return alloc::string::String::new();
            }
            let units = ((count as u128 * total_units as u128).div_ceil(max as u128)) as usize;
            let full = units / 8;
            let rem = units % 8;
            let mut bar = "█".repeat(full);
            if rem > 0 {
                let ch = match rem {
                    1 => '▏',
                    2 => '▎',
                    3 => '▍',
                    4 => '▌',
                    5 => '▋',
                    6 => '▊',
                    7 => '▉',
                    _ => unreachable!(),
                };
                bar.push(ch);
            }
            bar
        };

        for (psl, &count) in self.counts.iter().enumerate() {
            println!("{:>3} | {} ({})", psl, make_bar(count), count);
        }
    }
}

/// A hash table using Robin Hood linear probing with backward-shift deletion.
///
/// `HashTable<T>` stores values of type `T`. Like the raw tables it is modelled
/// on, it does not hash anything itself: every operation takes the item's
/// hash and an equality predicate. Two items are the same entry when their
/// hashes match *and* the predicate accepts the stored item.
///
/// ## Performance Characteristics
///
/// - **Memory**: one slot per `capacity / 0.85` elements, each slot holding a
///   `u64` hash, an occupancy flag, and a `T`.
/// - **Lookups**: bounded by the longest probe sequence, and misses stop early
///   at the first occupant closer to home than the probe.
/// - **Growth**: doubles the slot count and re-places every element using its
///   cached hash. Growth is the only operation with amortized cost.
///
/// ## Example
///
/// ```rust
/// # use core::hash::Hash;
/// # use core::hash::Hasher;
/// #
/// # use robin_hood_map::hash_table::HashTable;
/// # use siphasher::sip::SipHasher;
/// #
/// # #[derive(Debug, PartialEq)]
/// # struct Tile {
/// #     x: i32,
/// #     y: i32,
/// #     block: &'static str,
/// # }
/// #
/// # fn hash_coord(x: i32, y: i32) -> u64 {
/// #     let mut hasher = SipHasher::new();
/// #     (x, y).hash(&mut hasher);
/// #     hasher.finish()
/// # }
///
/// let mut table = HashTable::with_capacity(16);
/// let hash = hash_coord(3, -4);
///
/// match table.entry(hash, |t: &Tile| (t.x, t.y) == (3, -4)) {
///     robin_hood_map::hash_table::Entry::Vacant(entry) => {
///         entry.insert(Tile {
///             x: 3,
///             y: -4,
///             block: "stone",
///         });
///     }
///     robin_hood_map::hash_table::Entry::Occupied(_) => {
///         println!("Tile already placed");
///     }
/// }
///
/// assert_eq!(table.find(hash, |t| (t.x, t.y) == (3, -4)).unwrap().block, "stone");
/// ```
pub struct HashTable<T> {
    slots: NonNull<Slot<T>>,
    layout: Layout,

    populated: usize,
    grow_at: usize,
    mask: usize,

    _phantom: PhantomData<T>,
}

// SAFETY: The table owns its items exactly like `Vec<T>` does; it hands out
// `&T` only through `&self` and `&mut T` only through `&mut self`.
unsafe impl<T: Send> Send for HashTable<T> {}
// SAFETY: See above. No interior mutability is reachable through `&self`.
unsafe impl<T: Sync> Sync for HashTable<T> {}

impl<T> Debug for HashTable<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use alloc::format;
        use alloc::string::ToString;
        use alloc::vec::Vec;

        f.debug_struct("HashTable")
            .field(
                "slots",
                &self
                    .slots()
                    .chunks(16)
                    .enumerate()
                    .map(|(chunk, slots)| {
                        slots
                            .iter()
                            .enumerate()
                            .map(|(offset, slot)| {
                                if slot.occupied {
                                    format!("{:02}", self.psl_of(chunk * 16 + offset, slot.hash))
                                } else {
                                    "..".to_string()
                                }
                            })
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .collect::<Vec<_>>(),
            )
            .field("populated", &self.populated)
            .field("capacity", &self.grow_at)
            .finish()
    }
}

impl<T> Clone for HashTable<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        let mut new_table = Self::with_slot_count(self.slot_count(), Fallibility::Infallible)
            .unwrap_or_else(|_| unreachable!("infallible allocation returned an error"));

        // Same slot count means same mask, so every element keeps its index and
        // the copy satisfies the probing invariant as-is.
        for (index, slot) in self.slots().iter().enumerate() {
            if !slot.occupied {
                continue;
            }

            // SAFETY: `occupied` guarantees `item` is initialized.
            let item = unsafe { slot.item.assume_init_ref() }.clone();
            // SAFETY: `index` is in bounds since both tables have the same slot
            // count. Marking the slot occupied only after the write keeps
            // `new_table` droppable if a later `clone` panics.
            unsafe {
                let dst = new_table.slot_mut(index);
                dst.item.write(item);
                dst.hash = slot.hash;
                dst.occupied = true;
            }
            new_table.populated += 1;
        }

        debug_assert_eq!(new_table.populated, self.populated);
        new_table
    }
}

impl<T> Drop for HashTable<T> {
    fn drop(&mut self) {
        self.drop_items();

        // SAFETY: `slots` was allocated with `layout` and is released exactly
        // once here.
        unsafe { dealloc(self.slots.as_ptr().cast(), self.layout) };
    }
}

impl<T> Default for HashTable<T> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<T> HashTable<T> {
    /// Creates a new hash table with room for at least `capacity` slots.
    ///
    /// The slot count is `capacity` rounded up to the next power of two, and
    /// never less than 8. The table grows once 85% of the slots are in use.
    ///
    /// # Panics
    ///
    /// Panics if the slot count overflows, and aborts through
    /// [`handle_alloc_error`](alloc::alloc::handle_alloc_error) if the
    /// allocator fails.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use robin_hood_map::hash_table::HashTable;
    /// #
    /// let table: HashTable<String> = HashTable::with_capacity(100);
    /// assert_eq!(table.slot_count(), 128);
    /// assert!(table.capacity() >= 100);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        match Self::try_with_capacity_impl(capacity, Fallibility::Infallible) {
            Ok(table) => table,
            Err(_) => unreachable!("infallible allocation returned an error"),
        }
    }

    /// Fallible version of [`with_capacity`](Self::with_capacity).
    ///
    /// # Errors
    ///
    /// Returns [`TryReserveError::CapacityOverflow`] if the slot array would
    /// not fit in the address space, or [`TryReserveError::AllocError`] if the
    /// allocator fails.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use robin_hood_map::TryReserveError;
    /// # use robin_hood_map::hash_table::HashTable;
    /// #
    /// let table = HashTable::<u64>::try_with_capacity(64).unwrap();
    /// assert_eq!(table.slot_count(), 64);
    ///
    /// let too_big = HashTable::<u64>::try_with_capacity(usize::MAX);
    /// assert_eq!(too_big.unwrap_err(), TryReserveError::CapacityOverflow);
    /// ```
    pub fn try_with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        Self::try_with_capacity_impl(capacity, Fallibility::Fallible)
    }

    fn try_with_capacity_impl(
        capacity: usize,
        fallibility: Fallibility,
    ) -> Result<Self, TryReserveError> {
        let slot_count = capacity
            .max(MIN_CAPACITY)
            .checked_next_power_of_two()
            .ok_or_else(|| fallibility.capacity_overflow())?;
        Self::with_slot_count(slot_count, fallibility)
    }

    fn with_slot_count(slot_count: usize, fallibility: Fallibility) -> Result<Self, TryReserveError> {
        debug_assert!(slot_count.is_power_of_two() && slot_count >= MIN_CAPACITY);

        let layout =
            Layout::array::<Slot<T>>(slot_count).map_err(|_| fallibility.capacity_overflow())?;

        // SAFETY: `layout` has a non-zero size since `Slot<T>` holds at least a
        // `u64` and `slot_count >= MIN_CAPACITY`. Zeroing the block marks every
        // slot unoccupied.
        let slots = unsafe {
            let raw_alloc = alloc(layout);
            if raw_alloc.is_null() {
                let err = fallibility.alloc_err(layout);
                log::debug!("robin hood table allocation failed: {err}");
                return Err(err);
            }
            core::ptr::write_bytes(raw_alloc, 0x0, layout.size());
            NonNull::new_unchecked(raw_alloc.cast::<Slot<T>>())
        };

        Ok(Self {
            slots,
            layout,
            populated: 0,
            grow_at: target_load_factor(slot_count),
            mask: slot_count - 1,
            _phantom: PhantomData,
        })
    }

    #[inline(always)]
    fn slots(&self) -> &[Slot<T>] {
        // SAFETY: The allocation holds `mask + 1` slots whose `hash` and
        // `occupied` fields are always initialized.
        unsafe { core::slice::from_raw_parts(self.slots.as_ptr(), self.mask + 1) }
    }

    /// # Safety
    ///
    /// `index` must be less than the slot count.
    #[inline(always)]
    unsafe fn slot(&self, index: usize) -> &Slot<T> {
        debug_assert!(index <= self.mask);
        // SAFETY: Caller ensures `index` is within the slot array.
        unsafe { &*self.slots.as_ptr().add(index) }
    }

    /// # Safety
    ///
    /// `index` must be less than the slot count.
    #[inline(always)]
    unsafe fn slot_mut(&mut self, index: usize) -> &mut Slot<T> {
        debug_assert!(index <= self.mask);
        // SAFETY: Caller ensures `index` is within the slot array.
        unsafe { &mut *self.slots.as_ptr().add(index) }
    }

    #[inline(always)]
    fn home(&self, hash: u64) -> usize {
        hash as usize & self.mask
    }

    #[inline(always)]
    fn psl_of(&self, index: usize, hash: u64) -> usize {
        index.wrapping_sub(self.home(hash)) & self.mask
    }

    /// Inspect the slot at `index` for a probe that has travelled `psl` slots
    /// looking for `hash`.
    ///
    /// # Safety
    ///
    /// `index` must be less than the slot count.
    #[inline(always)]
    unsafe fn probe(&self, index: usize, psl: usize, hash: u64, eq: &impl Fn(&T) -> bool) -> Probe {
        // SAFETY: Caller ensures `index` is in bounds.
        let slot = unsafe { self.slot(index) };
        if !slot.occupied {
            return Probe::Vacant;
        }

        let resident = self.psl_of(index, slot.hash);
        if resident < psl {
            return Probe::Evict(resident);
        }

        // SAFETY: The slot is occupied, so its item is initialized.
        if slot.hash == hash && eq(unsafe { slot.item.assume_init_ref() }) {
            return Probe::Match;
        }

        Probe::Skip
    }

    /// Locate the item matching `hash` and `eq`.
    ///
    /// Returns `Ok(index)` of the matching slot, or `Err((index, psl))` naming
    /// the slot where such an item would be placed and its PSL there.
    #[inline]
    fn search(&self, hash: u64, eq: impl Fn(&T) -> bool) -> Result<usize, (usize, usize)> {
        let mut index = self.home(hash);
        for psl in 0..=self.mask {
            // SAFETY: `index` is always masked into the slot array.
            match unsafe { self.probe(index, psl, hash, &eq) } {
                Probe::Match => return Ok(index),
                Probe::Vacant | Probe::Evict(_) => return Err((index, psl)),
                Probe::Skip => index = (index + 1) & self.mask,
            }
        }

        unreachable!("robin hood probe visited every slot of a table that is never full")
    }

    /// Place `item` at `index`, then carry any evicted occupants forward until
    /// one lands in an empty slot.
    ///
    /// `index` must be the vacancy returned by [`search`](Self::search) (or
    /// [`find_vacancy`](Self::find_vacancy)) for `hash`, with `psl` the PSL
    /// there. The caller's item stays at `index`; only evicted items move on.
    ///
    /// # Safety
    ///
    /// `index` must be less than the slot count and the table must have at
    /// least one empty slot.
    unsafe fn place(&mut self, index: usize, psl: usize, hash: u64, item: T) {
        let mut index = index;
        let mut psl = psl;
        let mut carried_hash = hash;
        let mut carried = item;

        let never_matches = |_: &T| false;
        for _ in 0..=self.mask {
            // SAFETY: `index` is always masked into the slot array.
            match unsafe { self.probe(index, psl, carried_hash, &never_matches) } {
                Probe::Vacant => {
                    // SAFETY: In bounds, and the slot is empty so nothing is
                    // overwritten.
                    let slot = unsafe { self.slot_mut(index) };
                    slot.item.write(carried);
                    slot.hash = carried_hash;
                    slot.occupied = true;
                    self.populated += 1;
                    return;
                }
                Probe::Evict(resident) => {
                    // SAFETY: In bounds, and the slot is occupied so its item is
                    // initialized.
                    let slot = unsafe { self.slot_mut(index) };
                    core::mem::swap(&mut carried, unsafe { slot.item.assume_init_mut() });
                    core::mem::swap(&mut carried_hash, &mut slot.hash);
                    psl = resident;
                }
                Probe::Skip => {}
                Probe::Match => unreachable!("placement never compares items"),
            }

            index = (index + 1) & self.mask;
            psl += 1;
        }

        unreachable!("robin hood placement visited every slot of a table that is never full")
    }

    /// Find where an item with `hash` would go, ignoring equality.
    fn find_vacancy(&self, hash: u64) -> (usize, usize) {
        match self.search(hash, |_| false) {
            Ok(_) => unreachable!("vacancy search never compares items"),
            Err(vacancy) => vacancy,
        }
    }

    /// Empty the slot at `index` and close the gap by shifting displaced
    /// successors back one slot each.
    ///
    /// # Safety
    ///
    /// `index` must be less than the slot count and refer to an occupied slot.
    unsafe fn take(&mut self, index: usize) -> T {
        // SAFETY: Caller ensures the slot exists and is occupied.
        let item = unsafe {
            let slot = self.slot_mut(index);
            slot.occupied = false;
            slot.item.assume_init_read()
        };
        self.populated -= 1;

        let mut hole = index;
        loop {
            let next = (hole + 1) & self.mask;
            // SAFETY: `next` is masked into the slot array.
            let slot = unsafe { self.slot(next) };
            if !slot.occupied || self.psl_of(next, slot.hash) == 0 {
                break;
            }

            // SAFETY: `hole` and `next` are distinct, in-bounds slots; `hole` is
            // empty so its stale bytes may be overwritten, and `next` is marked
            // empty right after its contents are moved out.
            unsafe {
                let base = self.slots.as_ptr();
                core::ptr::copy_nonoverlapping(base.add(next), base.add(hole), 1);
                (*base.add(next)).occupied = false;
            }
            hole = next;
        }

        item
    }

    /// Drop every stored item and mark all slots empty.
    fn drop_items(&mut self) {
        if self.populated == 0 {
            return;
        }

        for index in 0..=self.mask {
            // SAFETY: `index` is in bounds; the item is dropped only when the
            // slot was occupied, and the slot is cleared first so a panicking
            // destructor cannot cause a double drop.
            unsafe {
                let slot = self.slot_mut(index);
                if slot.occupied {
                    slot.occupied = false;
                    slot.item.assume_init_drop();
                    self.populated -= 1;
                }
            }
        }
    }

    /// Returns an iterator over all values in the table.
    ///
    /// Values are yielded in slot order, which is neither insertion order nor
    /// stable across any insertion or removal.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use robin_hood_map::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(8);
    /// table.insert_unique(1, "a");
    /// table.insert_unique(2, "b");
    ///
    /// let mut values: Vec<_> = table.iter().copied().collect();
    /// values.sort();
    /// assert_eq!(values, ["a", "b"]);
    /// ```
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            slots: self.slots().iter(),
            remaining: self.populated,
        }
    }

    /// Returns an iterator yielding mutable references to all values.
    ///
    /// Values may be updated in place; changing anything that feeds the hash
    /// or equality of an item is a logic error.
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        // SAFETY: `&mut self` gives exclusive access to all `mask + 1` slots.
        let slots = unsafe { core::slice::from_raw_parts_mut(self.slots.as_ptr(), self.mask + 1) };
        IterMut {
            slots: slots.iter_mut(),
            remaining: self.populated,
        }
    }

    /// Returns an iterator that removes and yields all values from the table.
    ///
    /// The table keeps its slot count. Values not consumed by the caller are
    /// dropped when the iterator is dropped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use robin_hood_map::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(8);
    /// table.insert_unique(7, String::from("seven"));
    ///
    /// let values: Vec<String> = table.drain().collect();
    /// assert!(table.is_empty());
    /// assert_eq!(values, ["seven"]);
    /// ```
    pub fn drain(&mut self) -> Drain<'_, T> {
        Drain {
            table: self,
            slot_index: 0,
        }
    }

    /// Returns `true` if the table contains no elements.
    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }

    /// Returns the number of elements in the table.
    pub fn len(&self) -> usize {
        self.populated
    }

    /// Returns the number of elements the table holds before it grows.
    pub fn capacity(&self) -> usize {
        self.grow_at
    }

    /// Returns the number of slots in the backing array. Always a power of two.
    pub fn slot_count(&self) -> usize {
        self.mask + 1
    }

    /// Removes all elements from the table, keeping the allocation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use robin_hood_map::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(8);
    /// table.insert_unique(1, 1);
    /// table.insert_unique(2, 2);
    ///
    /// table.clear();
    /// assert!(table.is_empty());
    /// assert_eq!(table.slot_count(), 8);
    /// ```
    pub fn clear(&mut self) {
        self.drop_items();
        debug_assert_eq!(self.populated, 0);
    }

    /// Reserves capacity for at least `additional` more elements.
    ///
    /// After calling `reserve`, [`capacity`](Self::capacity) is at least
    /// `self.len() + additional`. Does nothing if that already holds.
    ///
    /// # Panics
    ///
    /// Panics if the new slot count overflows `usize`.
    pub fn reserve(&mut self, additional: usize) {
        if let Err(err) = self.reserve_impl(additional, Fallibility::Infallible) {
            unreachable!("infallible reserve returned {err}");
        }
    }

    /// Fallible version of [`reserve`](Self::reserve).
    ///
    /// On error the table is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`TryReserveError`] when the new slot array cannot be sized or
    /// allocated.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        self.reserve_impl(additional, Fallibility::Fallible)
    }

    fn reserve_impl(
        &mut self,
        additional: usize,
        fallibility: Fallibility,
    ) -> Result<(), TryReserveError> {
        let required = self
            .populated
            .checked_add(additional)
            .ok_or_else(|| fallibility.capacity_overflow())?;
        if required <= self.grow_at {
            return Ok(());
        }

        let slot_count = slots_for_items(required, fallibility)?;
        self.resize(slot_count, fallibility)
    }

    /// Shrinks the slot array to the smallest power of two that holds the
    /// current elements below the load threshold.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use robin_hood_map::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(1024);
    /// table.insert_unique(1, 1);
    /// table.shrink_to_fit();
    /// assert_eq!(table.slot_count(), 8);
    /// assert_eq!(table.find(1, |&v| v == 1), Some(&1));
    /// ```
    pub fn shrink_to_fit(&mut self) {
        let slot_count = match slots_for_items(self.populated, Fallibility::Infallible) {
            Ok(slot_count) => slot_count,
            Err(err) => unreachable!("infallible sizing returned {err}"),
        };
        if slot_count < self.slot_count() {
            if let Err(err) = self.resize(slot_count, Fallibility::Infallible) {
                unreachable!("infallible resize returned {err}");
            }
        }
    }

    #[inline]
    fn maybe_grow(&mut self, fallibility: Fallibility) -> Result<(), TryReserveError> {
        if self.populated >= self.grow_at {
            return self.grow(fallibility);
        }
        Ok(())
    }

    #[cold]
    #[inline(never)]
    fn grow(&mut self, fallibility: Fallibility) -> Result<(), TryReserveError> {
        let slot_count = self
            .slot_count()
            .checked_mul(2)
            .ok_or_else(|| fallibility.capacity_overflow())?;
        self.resize(slot_count, fallibility)
    }

    /// Move every element into a fresh array of `slot_count` slots.
    ///
    /// The new array is fully allocated before the old one is touched, so a
    /// failed allocation leaves the table exactly as it was.
    fn resize(&mut self, slot_count: usize, fallibility: Fallibility) -> Result<(), TryReserveError> {
        debug_assert!(target_load_factor(slot_count) >= self.populated);

        let mut new_table = Self::with_slot_count(slot_count, fallibility)?;
        log::trace!(
            "resizing robin hood table from {} to {} slots with {} elements",
            self.slot_count(),
            slot_count,
            self.populated
        );

        for index in 0..=self.mask {
            // SAFETY: `index` is in bounds. Each occupied item is moved out
            // bitwise and its old slot cleared, so the old array ends up holding
            // nothing that needs dropping. `place` only moves items and never
            // calls user code, so nothing can unwind mid-transfer.
            unsafe {
                let slot = self.slot_mut(index);
                if !slot.occupied {
                    continue;
                }
                slot.occupied = false;
                let hash = slot.hash;
                let item = slot.item.assume_init_read();

                let (vacancy, psl) = new_table.find_vacancy(hash);
                new_table.place(vacancy, psl, hash, item);
            }
        }

        debug_assert_eq!(new_table.populated, self.populated);
        self.populated = 0;
        // The old, now empty, allocation is released when `new_table` drops.
        core::mem::swap(self, &mut new_table);
        Ok(())
    }

    /// Removes and returns a value from the table.
    ///
    /// The value is identified by its hash and an equality predicate. Later
    /// elements of the same cluster are shifted back to close the gap.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use robin_hood_map::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(8);
    /// table.insert_unique(42, 42u64);
    ///
    /// assert_eq!(table.remove(42, |&n| n == 42), Some(42));
    /// assert!(table.is_empty());
    /// assert_eq!(table.remove(99, |&n| n == 99), None);
    /// ```
    pub fn remove(&mut self, hash: u64, eq: impl Fn(&T) -> bool) -> Option<T> {
        if self.populated == 0 {
            return None;
        }

        let index = self.search(hash, eq).ok()?;
        // SAFETY: `search` returned an in-bounds, occupied slot.
        Some(unsafe { self.take(index) })
    }

    /// Retains only the values for which `f` returns `true`.
    ///
    /// Each value is visited exactly once. Removed values are dropped in place
    /// and their clusters shifted back as with [`remove`](Self::remove).
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use robin_hood_map::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(8);
    /// for v in 0..6u64 {
    ///     table.insert_unique(v % 2, v);
    /// }
    ///
    /// table.retain(|v| *v % 3 == 0);
    /// let mut left: Vec<_> = table.iter().copied().collect();
    /// left.sort();
    /// assert_eq!(left, [0, 3]);
    /// ```
    pub fn retain(&mut self, mut f: impl FnMut(&mut T) -> bool) {
        if self.populated == 0 {
            return;
        }

        // Walking from an empty slot means no cluster wraps past the start,
        // so a backward shift only ever pulls in slots not yet visited.
        let Some(start) = self.slots().iter().position(|slot| !slot.occupied) else {
            unreachable!("load threshold keeps at least one slot empty")
        };

        let mut offset = 1;
        while offset <= self.mask {
            let index = (start + offset) & self.mask;
            // SAFETY: `index` is masked into the slot array, and the item is
            // only borrowed while the slot is occupied.
            let keep = unsafe {
                let slot = self.slot_mut(index);
                !slot.occupied || f(slot.item.assume_init_mut())
            };

            if keep {
                offset += 1;
            } else {
                // SAFETY: The slot was just seen occupied. Its successor, if
                // shifted in, is examined at the same offset next round.
                drop(unsafe { self.take(index) });
            }
        }
    }

    /// Gets an entry for the given hash and equality predicate.
    ///
    /// Grows the table first if it is at its load threshold, so a
    /// [`VacantEntry`] can always be filled without reallocating.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use robin_hood_map::hash_table::Entry;
    /// # use robin_hood_map::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(8);
    ///
    /// match table.entry(5, |&(k, _): &(u32, u32)| k == 5) {
    ///     Entry::Vacant(entry) => {
    ///         entry.insert((5, 1));
    ///     }
    ///     Entry::Occupied(mut entry) => {
    ///         entry.get_mut().1 += 1;
    ///     }
    /// }
    ///
    /// table.entry(5, |&(k, _)| k == 5).or_insert((5, 0)).1 += 1;
    /// assert_eq!(table.find(5, |&(k, _)| k == 5), Some(&(5, 2)));
    /// ```
    #[inline]
    pub fn entry(&mut self, hash: u64, eq: impl Fn(&T) -> bool) -> Entry<'_, T> {
        if let Err(err) = self.maybe_grow(Fallibility::Infallible) {
            unreachable!("infallible growth returned {err}");
        }
        self.entry_impl(hash, eq)
    }

    /// Fallible version of [`entry`](Self::entry).
    ///
    /// # Errors
    ///
    /// Returns [`TryReserveError`] if the table needed to grow and could not.
    /// The table is unchanged in that case.
    #[inline]
    pub fn try_entry(
        &mut self,
        hash: u64,
        eq: impl Fn(&T) -> bool,
    ) -> Result<Entry<'_, T>, TryReserveError> {
        self.maybe_grow(Fallibility::Fallible)?;
        Ok(self.entry_impl(hash, eq))
    }

    #[inline]
    fn entry_impl(&mut self, hash: u64, eq: impl Fn(&T) -> bool) -> Entry<'_, T> {
        match self.search(hash, eq) {
            Ok(index) => Entry::Occupied(OccupiedEntry { table: self, index }),
            Err((index, psl)) => Entry::Vacant(VacantEntry {
                table: self,
                hash,
                index,
                psl,
            }),
        }
    }

    /// Inserts a value without checking whether an equal one is present.
    ///
    /// Inserting a value equal to one already stored is a logic error: both
    /// copies are kept and lookups will find only one of them.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use robin_hood_map::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(8);
    /// *table.insert_unique(3, 30) += 1;
    /// assert_eq!(table.find(3, |&v| v == 31), Some(&31));
    /// ```
    pub fn insert_unique(&mut self, hash: u64, value: T) -> &mut T {
        if let Err(err) = self.maybe_grow(Fallibility::Infallible) {
            unreachable!("infallible growth returned {err}");
        }

        let (index, psl) = self.find_vacancy(hash);
        // SAFETY: `find_vacancy` returns an in-bounds index, growth above left
        // at least one empty slot, and `place` keeps the new value at `index`.
        unsafe {
            self.place(index, psl, hash, value);
            self.slot_mut(index).item.assume_init_mut()
        }
    }

    /// Finds a value in the table by hash and equality predicate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use robin_hood_map::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(8);
    /// table.insert_unique(42, 42u64);
    ///
    /// assert_eq!(table.find(42, |&n| n == 42), Some(&42));
    /// assert_eq!(table.find(99, |&n| n == 99), None);
    /// ```
    #[inline]
    pub fn find(&self, hash: u64, eq: impl Fn(&T) -> bool) -> Option<&T> {
        if self.populated == 0 {
            return None;
        }

        let index = self.search(hash, eq).ok()?;
        // SAFETY: `search` returned an in-bounds, occupied slot.
        Some(unsafe { self.slot(index).item.assume_init_ref() })
    }

    /// Finds a value in the table by hash and equality predicate, returning a
    /// mutable reference.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use robin_hood_map::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(8);
    /// table.insert_unique(1, (1, "one"));
    ///
    /// if let Some(entry) = table.find_mut(1, |&(k, _)| k == 1) {
    ///     entry.1 = "uno";
    /// }
    /// assert_eq!(table.find(1, |&(k, _)| k == 1), Some(&(1, "uno")));
    /// ```
    #[inline]
    pub fn find_mut(&mut self, hash: u64, eq: impl Fn(&T) -> bool) -> Option<&mut T> {
        if self.populated == 0 {
            return None;
        }

        let index = self.search(hash, eq).ok()?;
        // SAFETY: `search` returned an in-bounds, occupied slot.
        Some(unsafe { self.slot_mut(index).item.assume_init_mut() })
    }

    /// Count of stored elements per probe sequence length.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> ProbeHistogram {
        let mut counts = alloc::vec::Vec::new();
        for (index, slot) in self.slots().iter().enumerate() {
            if !slot.occupied {
                continue;
            }
            let psl = self.psl_of(index, slot.hash);
            if counts.len() <= psl {
                counts.resize(psl + 1, 0);
            }
            counts[psl] += 1;
        }

        ProbeHistogram { counts }
    }

    /// Summary statistics about occupancy, probe lengths, and memory.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let histogram = self.probe_histogram();
        let total_slots = self.slot_count();
        let psl_sum: usize = histogram
            .counts
            .iter()
            .enumerate()
            .map(|(psl, count)| psl * count)
            .sum();

        DebugStats {
            populated: self.populated,
            capacity: self.grow_at,
            total_slots,
            max_psl: histogram.counts.len().saturating_sub(1),
            mean_psl: if self.populated == 0 {
                0.0
            } else {
                psl_sum as f64 / self.populated as f64
            },
            load_factor: self.populated as f64 / total_slots as f64,
            total_bytes: self.layout.size(),
            wasted_bytes: (total_slots - self.populated) * core::mem::size_of::<Slot<T>>(),
        }
    }

    /// Slot index and PSL of the item matching `hash` and `eq`.
    #[cfg(test)]
    pub(crate) fn locate(&self, hash: u64, eq: impl Fn(&T) -> bool) -> Option<(usize, usize)> {
        let index = self.search(hash, eq).ok()?;
        Some((index, self.psl_of(index, hash)))
    }

    #[cfg(test)]
    pub(crate) fn is_slot_occupied(&self, index: usize) -> bool {
        self.slots()[index].occupied
    }

    /// Panics unless every structural invariant of the table holds.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        let slots = self.slots();
        assert!(self.slot_count().is_power_of_two());
        assert!(self.slot_count() >= MIN_CAPACITY);
        assert!(self.populated <= self.grow_at);
        assert!(self.grow_at < self.slot_count());
        assert_eq!(
            slots.iter().filter(|slot| slot.occupied).count(),
            self.populated,
            "occupied slot count disagrees with len: {self:#?}"
        );

        for (index, slot) in slots.iter().enumerate() {
            if !slot.occupied {
                continue;
            }
            let psl = self.psl_of(index, slot.hash);
            for back in 1..=psl {
                let between = index.wrapping_sub(back) & self.mask;
                assert!(
                    slots[between].occupied,
                    "slot {index} (psl {psl}) is separated from its home by empty slot {between}: {self:#?}"
                );
            }

            let prev = index.wrapping_sub(1) & self.mask;
            if psl > 0 {
                let prev_psl = self.psl_of(prev, slots[prev].hash);
                assert!(
                    prev_psl + 1 >= psl,
                    "slot {index} (psl {psl}) follows a richer slot {prev} (psl {prev_psl}): {self:#?}"
                );
            }
        }
    }
}

/// A view into a single position of a [`HashTable`], which may be vacant or
/// occupied.
pub enum Entry<'a, T> {
    /// No stored item matched.
    Vacant(VacantEntry<'a, T>),
    /// A stored item matched.
    Occupied(OccupiedEntry<'a, T>),
}

impl<'a, T> Entry<'a, T> {
    /// Returns the existing value, or inserts `default`.
    pub fn or_insert(self, default: T) -> &'a mut T {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Returns the existing value, or inserts the result of `default`.
    pub fn or_insert_with(self, default: impl FnOnce() -> T) -> &'a mut T {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Applies `f` to an occupied value before any further entry calls.
    pub fn and_modify(self, f: impl FnOnce(&mut T)) -> Self {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }

    /// Returns the existing value, or inserts `T::default()`.
    pub fn or_default(self) -> &'a mut T
    where
        T: Default,
    {
        self.or_insert_with(Default::default)
    }
}

/// A view into an empty position of a [`HashTable`].
///
/// The table has already been grown if needed, so inserting never
/// reallocates.
pub struct VacantEntry<'a, T> {
    table: &'a mut HashTable<T>,
    hash: u64,
    index: usize,
    psl: usize,
}

impl<'a, T> VacantEntry<'a, T> {
    /// Inserts a value into the table and returns a mutable reference to it.
    ///
    /// Occupants closer to their home than the new value are displaced
    /// further along their cluster.
    pub fn insert(self, value: T) -> &'a mut T {
        // SAFETY: `index` came from `search` on this table, which has not been
        // touched since, and the load threshold guarantees an empty slot.
        unsafe {
            self.table.place(self.index, self.psl, self.hash, value);
            self.table.slot_mut(self.index).item.assume_init_mut()
        }
    }
}

/// A view into an occupied slot of a [`HashTable`].
pub struct OccupiedEntry<'a, T> {
    table: &'a mut HashTable<T>,
    index: usize,
}

impl<'a, T> OccupiedEntry<'a, T> {
    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &T {
        // SAFETY: `index` refers to the occupied slot found by `search`.
        unsafe { self.table.slot(self.index).item.assume_init_ref() }
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut T {
        // SAFETY: `index` refers to the occupied slot found by `search`.
        unsafe { self.table.slot_mut(self.index).item.assume_init_mut() }
    }

    /// Converts the entry into a mutable reference to the value with the
    /// lifetime of the entry.
    pub fn into_mut(self) -> &'a mut T {
        // SAFETY: `index` refers to the occupied slot found by `search`.
        unsafe { self.table.slot_mut(self.index).item.assume_init_mut() }
    }

    /// Removes the value, shifting later elements of its cluster back.
    pub fn remove(self) -> T {
        // SAFETY: `index` refers to the occupied slot found by `search`.
        unsafe { self.table.take(self.index) }
    }
}

/// An iterator over the values in a [`HashTable`], in slot order.
pub struct Iter<'a, T> {
    slots: core::slice::Iter<'a, Slot<T>>,
    remaining: usize,
}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            remaining: self.remaining,
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        for slot in self.slots.by_ref() {
            if slot.occupied {
                self.remaining -= 1;
                // SAFETY: Occupied slots hold initialized items.
                return Some(unsafe { slot.item.assume_init_ref() });
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
impl<T> core::iter::FusedIterator for Iter<'_, T> {}

/// A mutable iterator over the values in a [`HashTable`], in slot order.
pub struct IterMut<'a, T> {
    slots: core::slice::IterMut<'a, Slot<T>>,
    remaining: usize,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        for slot in self.slots.by_ref() {
            if slot.occupied {
                self.remaining -= 1;
                // SAFETY: Occupied slots hold initialized items, and each slot is
                // yielded at most once.
                return Some(unsafe { slot.item.assume_init_mut() });
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {}
impl<T> core::iter::FusedIterator for IterMut<'_, T> {}

/// A draining iterator over the values in a [`HashTable`].
///
/// Every yielded slot is emptied immediately. Dropping the iterator drains
/// whatever is left, so the table is always empty afterwards.
pub struct Drain<'a, T> {
    table: &'a mut HashTable<T>,
    slot_index: usize,
}

impl<T> Drop for Drain<'_, T> {
    fn drop(&mut self) {
        for _ in &mut *self {}
    }
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        while self.table.populated > 0 && self.slot_index <= self.table.mask {
            let index = self.slot_index;
            self.slot_index += 1;

            // SAFETY: `index` is in bounds. The slot is cleared before its item
            // is moved out, and no backward shift is needed because every slot
            // ends up empty.
            unsafe {
                let slot = self.table.slot_mut(index);
                if slot.occupied {
                    slot.occupied = false;
                    let item = slot.item.assume_init_read();
                    self.table.populated -= 1;
                    return Some(item);
                }
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.table.populated, Some(self.table.populated))
    }
}

impl<T> ExactSizeIterator for Drain<'_, T> {}

/// An owning iterator over the values of a [`HashTable`].
pub struct IntoIter<T> {
    table: HashTable<T>,
    slot_index: usize,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        while self.table.populated > 0 && self.slot_index <= self.table.mask {
            let index = self.slot_index;
            self.slot_index += 1;

            // SAFETY: Same reasoning as `Drain::next`; the remaining items are
            // dropped by the table's own destructor.
            unsafe {
                let slot = self.table.slot_mut(index);
                if slot.occupied {
                    slot.occupied = false;
                    let item = slot.item.assume_init_read();
                    self.table.populated -= 1;
                    return Some(item);
                }
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.table.populated, Some(self.table.populated))
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}

impl<T> IntoIterator for HashTable<T> {
    type IntoIter = IntoIter<T>;
    type Item = T;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            table: self,
            slot_index: 0,
        }
    }
}

impl<'a, T> IntoIterator for &'a HashTable<T> {
    type IntoIter = Iter<'a, T>;
    type Item = &'a T;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut HashTable<T> {
    type IntoIter = IterMut<'a, T>;
    type Item = &'a mut T;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
