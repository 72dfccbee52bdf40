// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! GIC interrupt numbering, and the per-core record of the interrupt currently acknowledged.

use core::fmt::{self, Debug, Formatter};
use core::sync::atomic::{AtomicU32, Ordering};

use percore::{Cores, PerCore};

/// Shift of the interrupt ID field in `GICD_SGIR`.
pub const GICD_SGIR_SGIINTID_SHIFT: u32 = 0;
/// Shift of the CPU target list field in `GICD_SGIR`.
pub const GICD_SGIR_CPUTARGETLIST_SHIFT: u32 = 16;
/// Shift of the target list filter field in `GICD_SGIR`.
pub const GICD_SGIR_TARGETLISTFILTER_SHIFT: u32 = 24;

/// First software generated interrupt.
pub const SGI_START: u32 = 0;
/// First private peripheral interrupt.
pub const PPI_START: u32 = 16;
/// First shared peripheral interrupt.
pub const SPI_START: u32 = 32;

/// First of the special interrupt IDs; an acknowledge at or above this is spurious.
pub const SPECIAL_IRQ_START: u32 = 1020;
/// The ID read from the acknowledge register when no interrupt is pending.
pub const IRQ_NONE: u32 = 1023;

/// The interrupt ID bits of an acknowledge register value.
pub const IRQ_MASK: u32 = 0x3ff;

/// A hardware interrupt number.
pub type Irq = u16;

/// Returned in place of an [`Irq`] when there is no active interrupt.
pub const IRQ_INVALID: Irq = Irq::MAX;

/// Returns the index of the 32-bit distributor register holding the bit for `irq`.
pub const fn irq_reg(irq: u32) -> u32 {
    irq >> 5
}

/// Returns the bit position for `irq` in its distributor register.
pub const fn irq_bit(irq: u32) -> u32 {
    irq & 0x1f
}

/// Returns whether an acknowledge register value names a real interrupt.
pub const fn is_irq_valid(id: u32) -> bool {
    (id & IRQ_MASK) < SPECIAL_IRQ_START
}

/// Does nothing; spurious interrupts need no acknowledgement.
pub fn handle_spurious_irq() {}

/// The CPU interface of the interrupt controller.
pub trait IrqAcknowledge {
    /// Reads the interrupt acknowledge register.
    ///
    /// This marks the highest priority pending interrupt as active, so a second read returns a
    /// different interrupt.
    fn acknowledge(&mut self) -> u32;

    /// Signals the end of handling of an acknowledged interrupt.
    fn end_of_interrupt(&mut self, id: u32);
}

/// The interrupt acknowledged on each core and not yet completed.
pub struct ActiveIrq<C: Cores, const CORE_COUNT: usize> {
    slots: PerCore<[AtomicU32; CORE_COUNT], C>,
}

impl<C: Cores, const CORE_COUNT: usize> ActiveIrq<C, CORE_COUNT> {
    /// Returns a record with no interrupt active on any core.
    pub const fn new() -> Self {
        Self {
            slots: PerCore::new([const { AtomicU32::new(IRQ_NONE) }; CORE_COUNT]),
        }
    }

    fn slot(&self) -> &AtomicU32 {
        self.slots.get()
    }

    /// Returns the raw acknowledge value cached for the current core.
    pub fn raw(&self) -> u32 {
        self.slot().load(Ordering::Relaxed)
    }

    /// Returns the interrupt active on the current core, acknowledging a new one from `gic` if
    /// none is cached.
    pub fn active(&self, gic: &mut impl IrqAcknowledge) -> Option<Irq> {
        let slot = self.slot();
        let mut id = slot.load(Ordering::Relaxed);
        if !is_irq_valid(id) {
            id = gic.acknowledge();
            slot.store(id, Ordering::Relaxed);
        }

        if is_irq_valid(id) {
            Irq::try_from(id & IRQ_MASK).ok()
        } else {
            None
        }
    }

    /// Completes the interrupt active on the current core, if any.
    pub fn complete(&self, gic: &mut impl IrqAcknowledge) {
        let id = self.slot().swap(IRQ_NONE, Ordering::Relaxed);
        if is_irq_valid(id) {
            gic.end_of_interrupt(id);
        }
    }
}

impl<C: Cores, const CORE_COUNT: usize> Debug for ActiveIrq<C, CORE_COUNT> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveIrq")
            .field("cores", &CORE_COUNT)
            .finish_non_exhaustive()
    }
}

impl<C: Cores, const CORE_COUNT: usize> Default for ActiveIrq<C, CORE_COUNT> {
    fn default() -> Self {
        Self::new()
    }
}
