//! The store: one growable arena of cells, each holding the current value of
//! some variable.
//!
//! Cells are only ever appended and overwritten. An [`Address`] handed out by
//! [`Store::allocate`] stays valid for as long as the store lives.

use core::fmt;

use crate::world::value::Value;

/// Index of a cell in a [`Store`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(usize);

impl Address {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("address out of bounds: {0}")]
pub struct OutOfBounds(pub Address);

#[derive(Debug, Default)]
pub struct Store {
    cells: Vec<Value>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a cell holding `value`, returning its address.
    pub fn allocate(&mut self, value: Value) -> Address {
        let address = Address(self.cells.len());
        tracing::trace!(%address, "allocating cell");
        self.cells.push(value);
        address
    }

    /// Allocates one cell per value, in order. The returned addresses are
    /// strictly increasing and line up positionally with `values`.
    pub fn allocate_all(&mut self, values: impl IntoIterator<Item = Value>) -> Vec<Address> {
        values.into_iter().map(|value| self.allocate(value)).collect()
    }

    pub fn read(&self, address: Address) -> Result<Value, OutOfBounds> {
        self.cells.get(address.0).cloned().ok_or(OutOfBounds(address))
    }

    pub fn write(&mut self, address: Address, value: Value) -> Result<(), OutOfBounds> {
        let cell = self.cells.get_mut(address.0).ok_or(OutOfBounds(address))?;
        tracing::trace!(%address, "overwriting cell");
        *cell = value;
        Ok(())
    }

    /// The highest valid address, if any cell was allocated yet.
    pub fn last_address(&self) -> Option<Address> {
        self.cells.len().checked_sub(1).map(Address)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
