// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

mod common;

use armv8_vcpu::hyp::{HCR_NATIVE, HCR_VCPU, SCTLR_EL1_NATIVE, VTCR_EL2_BOOT};
use armv8_vcpu::{Profile, SysReg, boot_init};
use common::{Event, FakeRegisters};

#[test]
fn boot_programs_vtcr_hcr_sctlr_with_barriers() {
    let mut hw = FakeRegisters::new();
    boot_init(&mut hw);

    assert_eq!(
        hw.events,
        [
            Event::Write(SysReg::VtcrEl2, 0x8004_3594),
            Event::Isb,
            Event::Write(SysReg::HcrEl2, 0x8e28_703b),
            Event::Isb,
            Event::Write(SysReg::SctlrEl1, 0x34d5_9824),
            Event::Isb,
        ]
    );
}

#[test]
fn boot_leaves_native_configuration_loaded() {
    let mut hw = FakeRegisters::new();
    boot_init(&mut hw);

    assert_eq!(hw.get(SysReg::VtcrEl2), VTCR_EL2_BOOT.bits());
    assert_eq!(hw.get(SysReg::HcrEl2), HCR_NATIVE.bits());
    assert_eq!(hw.get(SysReg::SctlrEl1), SCTLR_EL1_NATIVE.bits());
    assert_eq!(hw.writes().len(), 3);
}

#[test]
fn profile_switch() {
    let mut hw = FakeRegisters::new();
    Profile::Vcpu.apply(&mut hw);
    Profile::Native.apply(&mut hw);

    assert_eq!(
        hw.events,
        [
            Event::Write(SysReg::HcrEl2, HCR_VCPU.bits()),
            Event::Isb,
            Event::Write(SysReg::HcrEl2, HCR_NATIVE.bits()),
            Event::Isb,
        ]
    );
}
