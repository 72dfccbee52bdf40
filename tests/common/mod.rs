// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

#![allow(dead_code)]

use std::collections::HashMap;

use armv8_vcpu::{SysReg, SystemRegisters, VcpuReg};

/// An access made through [`FakeRegisters`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Event {
    Read(SysReg),
    Write(SysReg, u64),
    Isb,
}

/// System registers backed by a map, recording every access.
#[derive(Debug, Default, Clone)]
pub struct FakeRegisters {
    values: HashMap<SysReg, u64>,
    pub events: Vec<Event>,
}

impl FakeRegisters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns registers where every VCPU-backed register holds a distinct value.
    pub fn populated() -> Self {
        let mut hw = Self::new();
        for (i, reg) in VcpuReg::ALL.iter().enumerate() {
            if let Some(sysreg) = backing(*reg) {
                let i = i as u64;
                let value = if is_32bit(*reg) {
                    0x8000_0100 + i
                } else {
                    0xffff_0000_0000_1000 + (i << 4)
                };
                hw.set(sysreg, value);
            }
        }
        hw
    }

    /// Returns the current value of `reg` without recording an access.
    pub fn get(&self, reg: SysReg) -> u64 {
        self.values.get(&reg).copied().unwrap_or_default()
    }

    /// Sets `reg` without recording an access.
    pub fn set(&mut self, reg: SysReg, value: u64) {
        self.values.insert(reg, value);
    }

    pub fn snapshot(&self) -> HashMap<SysReg, u64> {
        self.values.clone()
    }

    pub fn writes(&self) -> Vec<(SysReg, u64)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::Write(reg, value) => Some((*reg, *value)),
                _ => None,
            })
            .collect()
    }
}

impl SystemRegisters for FakeRegisters {
    fn read(&mut self, reg: SysReg) -> u64 {
        self.events.push(Event::Read(reg));
        self.get(reg)
    }

    fn write(&mut self, reg: SysReg, value: u64) {
        self.events.push(Event::Write(reg, value));
        if reg != SysReg::IsrEl1 {
            self.set(reg, value);
        }
    }

    fn isb(&mut self) {
        self.events.push(Event::Isb);
    }
}

/// Returns the physical register backing `reg`, if any.
pub fn backing(reg: VcpuReg) -> Option<SysReg> {
    Some(match reg {
        VcpuReg::Sctlr => SysReg::SctlrEl1,
        VcpuReg::Ttbr0 => SysReg::Ttbr0El1,
        VcpuReg::Ttbr1 => SysReg::Ttbr1El1,
        VcpuReg::Tcr => SysReg::TcrEl1,
        VcpuReg::Mair => SysReg::MairEl1,
        VcpuReg::Amair => SysReg::AmairEl1,
        VcpuReg::Cidr => SysReg::ContextidrEl1,
        VcpuReg::Actlr => SysReg::ActlrEl1,
        VcpuReg::Cpacr => SysReg::CpacrEl1,
        VcpuReg::Afsr0 => SysReg::Afsr0El1,
        VcpuReg::Afsr1 => SysReg::Afsr1El1,
        VcpuReg::Esr => SysReg::EsrEl1,
        VcpuReg::Far => SysReg::FarEl1,
        VcpuReg::Isr => SysReg::IsrEl1,
        VcpuReg::Vbar => SysReg::VbarEl1,
        VcpuReg::TpidrEl0 => SysReg::TpidrEl0,
        VcpuReg::TpidrEl1 => SysReg::TpidrEl1,
        VcpuReg::TpidrroEl0 => SysReg::TpidrroEl0,
        VcpuReg::CntvTval => SysReg::CntvTvalEl0,
        VcpuReg::CntvCtl => SysReg::CntvCtlEl0,
        VcpuReg::CntvCval => return None,
        VcpuReg::SpEl1 => SysReg::SpEl1,
        VcpuReg::ElrEl1 => SysReg::ElrEl1,
        VcpuReg::SpsrEl1 => SysReg::SpsrEl1,
    })
}

pub fn is_32bit(reg: VcpuReg) -> bool {
    matches!(
        reg,
        VcpuReg::Cidr | VcpuReg::Afsr0 | VcpuReg::Afsr1 | VcpuReg::Esr | VcpuReg::Isr
    )
}
