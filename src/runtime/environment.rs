//! Environments map names to store addresses, never to values.
//!
//! A chain of extension frames always ends in the single global frame owned by
//! the [`World`](crate::World). Extension frames are immutable once built, which
//! is what lets every closure share the chain it captured.
use std::rc::Rc;

use lasso::Spur;

use super::store::Address;
use crate::RedefinePolicy;

#[derive(Debug, Clone, Default)]
pub enum Env {
    /// Only the global frame is in scope
    #[default]
    Global,
    Extended(Rc<Frame>),
}

/// Bindings introduced by one procedure call or `let`.
#[derive(Debug)]
pub struct Frame {
    vars: Rc<[Spur]>,
    addresses: Box<[Address]>,
    next: Env,
}

impl Frame {
    fn lookup_local(&self, name: Spur) -> Option<Address> {
        self.vars
            .iter()
            .position(|var| *var == name)
            .map(|idx| self.addresses[idx])
    }
}

impl Env {
    /// Pushes a frame binding `vars[i]` to `addresses[i]` in front of `next`.
    pub fn extend(vars: Rc<[Spur]>, addresses: Vec<Address>, next: Env) -> Self {
        debug_assert_eq!(
            vars.len(),
            addresses.len(),
            "every variable of a frame needs exactly one address"
        );
        Self::Extended(Rc::new(Frame {
            vars,
            addresses: addresses.into_boxed_slice(),
            next,
        }))
    }

    /// Finds the address of `name`, searching from the innermost frame outwards.
    pub fn lookup(&self, global: &GlobalFrame, name: Spur) -> Option<Address> {
        let mut env = self;
        loop {
            match env {
                Env::Global => return global.lookup(name),
                Env::Extended(frame) => {
                    if let Some(address) = frame.lookup_local(name) {
                        return Some(address);
                    }
                    env = &frame.next;
                }
            }
        }
    }
}

/// The one mutable frame: top-level `define`s land here.
#[derive(Debug, Default)]
pub struct GlobalFrame {
    vars: Vec<Spur>,
    addresses: Vec<Address>,
}

impl GlobalFrame {
    pub fn lookup(&self, name: Spur) -> Option<Address> {
        self.vars
            .iter()
            .position(|var| *var == name)
            .map(|idx| self.addresses[idx])
    }

    pub fn define(&mut self, name: Spur, address: Address, policy: RedefinePolicy) {
        if policy == RedefinePolicy::LatestWins {
            if let Some(idx) = self.vars.iter().position(|var| *var == name) {
                self.addresses[idx] = address;
                return;
            }
        }
        self.vars.push(name);
        self.addresses.push(address);
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
