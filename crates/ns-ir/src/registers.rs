//! Memory-mapped APU register file with bit-field views.
//!
//! The bus owns the 24 bytes at `$4000-$4017` plus two kinds of listener
//! lists. Write-strobe listeners fire on every CPU store to an address;
//! change listeners are attached to a [`RegisterView`] and fire only when
//! the bits it covers change. Listeners are plain keys of type `K`: the
//! bus returns the keys to notify, or hands them to a [`RegisterObserver`]
//! passed in by the caller, so no listener ever holds a reference into
//! the bus.

use alloc::vec::Vec;
use arrayvec::ArrayVec;

/// First mapped register address.
pub const APU_BASE: u16 = 0x4000;
/// Number of mapped register bytes (`$4000-$4017`).
pub const REGISTER_COUNT: usize = 0x18;

pub const PULSE1_BASE: u16 = 0x4000;
pub const PULSE2_BASE: u16 = 0x4004;
pub const TRIANGLE_BASE: u16 = 0x4008;
pub const NOISE_BASE: u16 = 0x400C;
pub const DMC_BASE: u16 = 0x4010;
pub const STATUS: u16 = 0x4015;
pub const FRAME_COUNTER: u16 = 0x4017;

/// Upper bound on distinct listener keys returned by a single store.
pub const MAX_NOTIFICATIONS: usize = 16;

/// Listener keys to dispatch after a store, deduplicated, in order.
pub type Notifications<K> = ArrayVec<K, MAX_NOTIFICATIONS>;

/// Receives the listener keys fired by a store, in registration order.
pub trait RegisterObserver<K> {
    /// `addr` is the byte that was stored (the first byte of the view for
    /// [`RegisterBus::update`]).
    fn notify(&mut self, key: K, bus: &RegisterBus<K>, addr: u16);
}

impl<K, F> RegisterObserver<K> for F
where
    F: FnMut(K, &RegisterBus<K>, u16),
{
    fn notify(&mut self, key: K, bus: &RegisterBus<K>, addr: u16) {
        self(key, bus, addr)
    }
}

/// A bit field over the register file.
///
/// Views are plain descriptors; reading and writing goes through the
/// [`RegisterBus`]. A view may start at any bit and span up to three
/// bytes, e.g. an 11-bit timer period split across a low and a high byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RegisterView {
    addr: u16,
    shift: u8,
    len: u8,
}

impl RegisterView {
    /// Widest field a view may describe.
    pub const MAX_BITS: u8 = 16;

    /// Describe `bit_length` bits starting `bit_offset` bits into `addr`.
    ///
    /// Offsets past the first byte are folded into the address, so
    /// `new(0x4000, 16, 11)` and `new(0x4002, 0, 11)` are the same view.
    /// Lengths are clamped to `1..=16`.
    pub const fn new(addr: u16, bit_offset: u16, bit_length: u8) -> Self {
        let len = if bit_length == 0 {
            1
        } else if bit_length > Self::MAX_BITS {
            Self::MAX_BITS
        } else {
            bit_length
        };
        Self {
            addr: addr.wrapping_add(bit_offset / 8),
            shift: (bit_offset % 8) as u8,
            len,
        }
    }

    /// Address of the first byte the view touches.
    pub const fn addr(&self) -> u16 {
        self.addr
    }

    /// Bit offset within the first byte.
    pub const fn bit_offset(&self) -> u8 {
        self.shift
    }

    pub const fn bit_length(&self) -> u8 {
        self.len
    }

    /// Number of bytes the view touches.
    pub const fn span(&self) -> u16 {
        (self.shift as u16 + self.len as u16).div_ceil(8)
    }

    /// Whether the view touches `addr`.
    pub const fn covers(&self, addr: u16) -> bool {
        addr >= self.addr && addr - self.addr < self.span()
    }

    /// Read this field from `bus`.
    pub fn get<K: Copy + PartialEq>(&self, bus: &RegisterBus<K>) -> u32 {
        bus.get(*self)
    }

    const fn mask(&self) -> u32 {
        (1u32 << self.len) - 1
    }
}

#[derive(Clone, Debug)]
struct Watcher<K> {
    view: RegisterView,
    key: K,
    value: u32,
}

/// The APU register file and its listener lists.
#[derive(Clone, Debug)]
pub struct RegisterBus<K> {
    bytes: [u8; REGISTER_COUNT],
    strobes: [Vec<K>; REGISTER_COUNT],
    watchers: Vec<Watcher<K>>,
    /// Watcher ids per byte, ascending (registration order).
    watch_index: [Vec<usize>; REGISTER_COUNT],
}

impl<K: Copy + PartialEq> RegisterBus<K> {
    /// An all-zero register file with no listeners.
    pub fn new() -> Self {
        Self {
            bytes: [0; REGISTER_COUNT],
            strobes: core::array::from_fn(|_| Vec::new()),
            watchers: Vec::new(),
            watch_index: core::array::from_fn(|_| Vec::new()),
        }
    }

    fn index(addr: u16) -> Option<usize> {
        let offset = usize::from(addr.checked_sub(APU_BASE)?);
        (offset < REGISTER_COUNT).then_some(offset)
    }

    /// Describe a bit field; see [`RegisterView::new`].
    pub fn view(&self, addr: u16, bit_offset: u16, bit_length: u8) -> RegisterView {
        RegisterView::new(addr, bit_offset, bit_length)
    }

    /// Notify `key` on every store to `addr`, changed or not.
    pub fn on_write(&mut self, addr: u16, key: K) {
        match Self::index(addr) {
            Some(i) => self.strobes[i].push(key),
            None => log::warn!("ignoring write listener on unmapped register ${addr:04X}"),
        }
    }

    /// Notify `key` whenever the bits under `view` change.
    pub fn watch(&mut self, view: RegisterView, key: K) {
        let id = self.watchers.len();
        let value = self.get(view);
        self.watchers.push(Watcher { view, key, value });
        for offset in 0..view.span() {
            if let Some(i) = Self::index(view.addr.wrapping_add(offset)) {
                self.watch_index[i].push(id);
            }
        }
    }

    /// Current byte at `addr`; unmapped addresses read as zero.
    pub fn read(&self, addr: u16) -> u8 {
        Self::index(addr).map_or(0, |i| self.bytes[i])
    }

    /// Current value of the field under `view`.
    pub fn get(&self, view: RegisterView) -> u32 {
        (self.raw(view) >> view.shift) & view.mask()
    }

    /// CPU store. Returns write-strobe listeners of `addr` followed by the
    /// change listeners of every view whose value changed.
    pub fn write(&mut self, addr: u16, value: u8) -> Notifications<K> {
        let mut out = Notifications::new();
        let Some(i) = Self::index(addr) else {
            log::trace!("ignoring store to unmapped register ${addr:04X}");
            return out;
        };
        self.bytes[i] = value;
        for &key in &self.strobes[i] {
            push_unique(&mut out, key);
        }
        for n in 0..self.watch_index[i].len() {
            let id = self.watch_index[i][n];
            self.refresh(id, &mut out);
        }
        out
    }

    /// Store `value` into the field under `view` without strobing write
    /// listeners. Returns the change listeners that fired.
    pub fn set(&mut self, view: RegisterView, value: u32) -> Notifications<K> {
        let field = view.mask() << view.shift;
        let raw = (self.raw(view) & !field) | ((value & view.mask()) << view.shift);
        for offset in 0..view.span() {
            if let Some(i) = Self::index(view.addr.wrapping_add(offset)) {
                self.bytes[i] = (raw >> (8 * offset)) as u8;
            }
        }

        let mut out = Notifications::new();
        for id in 0..self.watchers.len() {
            if overlaps(self.watchers[id].view, view) {
                self.refresh(id, &mut out);
            }
        }
        out
    }

    /// [`write`](Self::write), dispatching to `observer`.
    pub fn store(&mut self, addr: u16, value: u8, observer: &mut impl RegisterObserver<K>) {
        for key in self.write(addr, value) {
            observer.notify(key, self, addr);
        }
    }

    /// [`set`](Self::set), dispatching to `observer`.
    pub fn update(&mut self, view: RegisterView, value: u32, observer: &mut impl RegisterObserver<K>) {
        for key in self.set(view, value) {
            observer.notify(key, self, view.addr);
        }
    }

    fn raw(&self, view: RegisterView) -> u32 {
        (0..view.span()).fold(0u32, |raw, offset| {
            raw | (u32::from(self.read(view.addr.wrapping_add(offset))) << (8 * offset))
        })
    }

    fn refresh(&mut self, id: usize, out: &mut Notifications<K>) {
        let current = self.get(self.watchers[id].view);
        let watcher = &mut self.watchers[id];
        if current != watcher.value {
            watcher.value = current;
            push_unique(out, watcher.key);
        }
    }
}

impl<K: Copy + PartialEq> Default for RegisterBus<K> {
    fn default() -> Self {
        Self::new()
    }
}

fn overlaps(a: RegisterView, b: RegisterView) -> bool {
    a.addr < b.addr + b.span() && b.addr < a.addr + a.span()
}

fn push_unique<K: Copy + PartialEq>(out: &mut Notifications<K>, key: K) {
    if out.contains(&key) {
        return;
    }
    if out.try_push(key).is_err() {
        log::warn!("register notification list full, dropping a listener");
    }
}
