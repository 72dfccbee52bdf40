// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Per-VCPU shadow copies of the EL1/EL0 system registers.
//!
//! Only one VCPU can have its state loaded into the physical registers of a core at a time.
//! Whenever a VCPU is not the loaded one, its [`Vcpu`] shadow array is the authoritative copy of
//! its state. Switching VCPUs is a [`Vcpu::save_all`] of the outgoing one followed by a
//! [`Vcpu::restore_all`] of the incoming one.

use core::fmt::{self, Display, Formatter};

use crate::sysreg::{SysReg, SystemRegisters};

/// The number of virtualised registers, i.e. the length of [`Vcpu::regs`].
pub const VCPU_REG_COUNT: usize = VcpuReg::ALL.len();

const LOW_WORD: u64 = 0xffff_ffff;

/// A register virtualised per VCPU.
///
/// The discriminants are the indices used by the kernel ABI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(usize)]
pub enum VcpuReg {
    Sctlr = 0,
    Ttbr0,
    Ttbr1,
    Tcr,
    Mair,
    Amair,
    Cidr,
    Actlr,
    Cpacr,
    Afsr0,
    Afsr1,
    Esr,
    Far,
    Isr,
    Vbar,
    TpidrEl0,
    TpidrEl1,
    TpidrroEl0,
    CntvTval,
    CntvCtl,
    CntvCval,
    SpEl1,
    ElrEl1,
    SpsrEl1,
}

/// How a [`VcpuReg`] is backed by hardware.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Access {
    /// Saved from and restored to a physical register.
    ReadWrite,
    /// Saved from a physical register; restoring it does nothing.
    ReadOnly,
    /// Not backed by hardware. Saving it yields zero and restoring it does nothing.
    Unbacked,
}

impl VcpuReg {
    /// Every register, in index order.
    pub const ALL: [Self; 24] = [
        Self::Sctlr,
        Self::Ttbr0,
        Self::Ttbr1,
        Self::Tcr,
        Self::Mair,
        Self::Amair,
        Self::Cidr,
        Self::Actlr,
        Self::Cpacr,
        Self::Afsr0,
        Self::Afsr1,
        Self::Esr,
        Self::Far,
        Self::Isr,
        Self::Vbar,
        Self::TpidrEl0,
        Self::TpidrEl1,
        Self::TpidrroEl0,
        Self::CntvTval,
        Self::CntvCtl,
        Self::CntvCval,
        Self::SpEl1,
        Self::ElrEl1,
        Self::SpsrEl1,
    ];

    /// The lowest register index.
    pub const FIRST: Self = Self::Sctlr;

    /// The highest register index.
    pub const LAST: Self = Self::SpsrEl1;

    /// Returns the register's index in the shadow array.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the registers from `lo` to `hi` inclusive, in ascending order.
    ///
    /// The iterator is empty if `lo > hi`.
    pub fn range(lo: Self, hi: Self) -> impl Iterator<Item = Self> {
        (lo.index()..=hi.index()).map(|index| Self::ALL[index])
    }

    /// Returns how the register is backed by hardware.
    pub const fn access(self) -> Access {
        match self {
            Self::Isr => Access::ReadOnly,
            Self::CntvCval => Access::Unbacked,
            _ => Access::ReadWrite,
        }
    }

    /// Reads the physical register backing `self`.
    fn hw_read(self, hw: &mut impl SystemRegisters) -> u64 {
        match self {
            Self::Sctlr => hw.read(SysReg::SctlrEl1),
            Self::Ttbr0 => hw.read(SysReg::Ttbr0El1),
            Self::Ttbr1 => hw.read(SysReg::Ttbr1El1),
            Self::Tcr => hw.read(SysReg::TcrEl1),
            Self::Mair => hw.read(SysReg::MairEl1),
            Self::Amair => hw.read(SysReg::AmairEl1),
            Self::Cidr => hw.read(SysReg::ContextidrEl1) & LOW_WORD,
            Self::Actlr => hw.read(SysReg::ActlrEl1),
            Self::Cpacr => hw.read(SysReg::CpacrEl1),
            Self::Afsr0 => hw.read(SysReg::Afsr0El1) & LOW_WORD,
            Self::Afsr1 => hw.read(SysReg::Afsr1El1) & LOW_WORD,
            Self::Esr => hw.read(SysReg::EsrEl1) & LOW_WORD,
            Self::Far => hw.read(SysReg::FarEl1),
            Self::Isr => hw.read(SysReg::IsrEl1) & LOW_WORD,
            Self::Vbar => hw.read(SysReg::VbarEl1),
            Self::TpidrEl0 => hw.read(SysReg::TpidrEl0),
            Self::TpidrEl1 => hw.read(SysReg::TpidrEl1),
            Self::TpidrroEl0 => hw.read(SysReg::TpidrroEl0),
            Self::CntvTval => hw.read(SysReg::CntvTvalEl0),
            Self::CntvCtl => hw.read(SysReg::CntvCtlEl0),
            Self::CntvCval => 0,
            Self::SpEl1 => hw.read(SysReg::SpEl1),
            Self::ElrEl1 => hw.read(SysReg::ElrEl1),
            Self::SpsrEl1 => hw.read(SysReg::SpsrEl1),
        }
    }

    /// Writes `value` to the physical register backing `self`.
    fn hw_write(self, hw: &mut impl SystemRegisters, value: u64) {
        match self {
            Self::Sctlr => hw.write(SysReg::SctlrEl1, value),
            Self::Ttbr0 => hw.write(SysReg::Ttbr0El1, value),
            Self::Ttbr1 => hw.write(SysReg::Ttbr1El1, value),
            Self::Tcr => hw.write(SysReg::TcrEl1, value),
            Self::Mair => hw.write(SysReg::MairEl1, value),
            Self::Amair => hw.write(SysReg::AmairEl1, value),
            Self::Cidr => hw.write(SysReg::ContextidrEl1, value & LOW_WORD),
            Self::Actlr => hw.write(SysReg::ActlrEl1, value),
            Self::Cpacr => hw.write(SysReg::CpacrEl1, value),
            Self::Afsr0 => hw.write(SysReg::Afsr0El1, value & LOW_WORD),
            Self::Afsr1 => hw.write(SysReg::Afsr1El1, value & LOW_WORD),
            Self::Esr => hw.write(SysReg::EsrEl1, value & LOW_WORD),
            Self::Far => hw.write(SysReg::FarEl1, value),
            // ISR_EL1 is read-only.
            Self::Isr => {}
            Self::Vbar => hw.write(SysReg::VbarEl1, value),
            Self::TpidrEl0 => hw.write(SysReg::TpidrEl0, value),
            Self::TpidrEl1 => hw.write(SysReg::TpidrEl1, value),
            Self::TpidrroEl0 => hw.write(SysReg::TpidrroEl0, value),
            Self::CntvTval => hw.write(SysReg::CntvTvalEl0, value),
            Self::CntvCtl => hw.write(SysReg::CntvCtlEl0, value),
            // Not virtualised, see `Access::Unbacked`.
            Self::CntvCval => {}
            Self::SpEl1 => hw.write(SysReg::SpEl1, value),
            Self::ElrEl1 => hw.write(SysReg::ElrEl1, value),
            Self::SpsrEl1 => hw.write(SysReg::SpsrEl1, value),
        }
    }
}

impl From<VcpuReg> for usize {
    fn from(reg: VcpuReg) -> Self {
        reg.index()
    }
}

impl TryFrom<usize> for VcpuReg {
    type Error = InvalidRegister;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Self::ALL.get(index).copied().ok_or(InvalidRegister(index))
    }
}

/// A raw register index that does not name a [`VcpuReg`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct InvalidRegister(pub usize);

impl Display for InvalidRegister {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid VCPU register index {} (must be below {VCPU_REG_COUNT})",
            self.0
        )
    }
}

impl core::error::Error for InvalidRegister {}

/// The virtualised system register state of one VCPU.
#[derive(Debug, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct Vcpu {
    /// Shadow values, indexed by [`VcpuReg::index`].
    pub regs: [u64; VCPU_REG_COUNT],
}

impl Default for Vcpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Vcpu {
    /// Returns a VCPU with every shadow register zeroed.
    pub const fn new() -> Self {
        Self {
            regs: [0; VCPU_REG_COUNT],
        }
    }

    /// Copies the physical value of `reg` into the shadow array.
    pub fn save(&mut self, hw: &mut impl SystemRegisters, reg: VcpuReg) {
        self.regs[reg.index()] = reg.hw_read(hw);
    }

    /// Saves every register from `lo` to `hi` inclusive, in ascending order.
    pub fn save_range(&mut self, hw: &mut impl SystemRegisters, lo: VcpuReg, hi: VcpuReg) {
        for reg in VcpuReg::range(lo, hi) {
            self.save(hw, reg);
        }
    }

    /// Saves every register.
    pub fn save_all(&mut self, hw: &mut impl SystemRegisters) {
        self.save_range(hw, VcpuReg::FIRST, VcpuReg::LAST);
    }

    /// Loads the shadow value of `reg` into the physical register.
    pub fn restore(&self, hw: &mut impl SystemRegisters, reg: VcpuReg) {
        reg.hw_write(hw, self.regs[reg.index()]);
    }

    /// Restores every register from `lo` to `hi` inclusive, in ascending order.
    pub fn restore_range(&self, hw: &mut impl SystemRegisters, lo: VcpuReg, hi: VcpuReg) {
        for reg in VcpuReg::range(lo, hi) {
            self.restore(hw, reg);
        }
    }

    /// Restores every register.
    pub fn restore_all(&self, hw: &mut impl SystemRegisters) {
        self.restore_range(hw, VcpuReg::FIRST, VcpuReg::LAST);
    }

    /// Returns the shadow value of `reg` without touching hardware.
    pub fn read(&self, reg: VcpuReg) -> u64 {
        self.regs[reg.index()]
    }

    /// Sets the shadow value of `reg` without touching hardware.
    pub fn write(&mut self, reg: VcpuReg, value: u64) {
        self.regs[reg.index()] = value;
    }
}
