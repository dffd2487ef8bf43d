//! Load/store operation helpers.

use super::{Flag, W65C816};
use crate::core::{Bus, BusMaster};

impl W65C816 {
    pub(crate) fn op_lda<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
        low: u32,
        high: u32,
    ) {
        if self.check_flag(Flag::AccWidth) {
            let v = self.read(bus, master, low);
            self.a = (self.a & 0xFF00) | v as u16;
        } else {
            self.cycles_used += 1;
            self.a = self.read_word(bus, master, low, high);
        }
        self.set_zn(self.a, self.check_flag(Flag::AccWidth));
    }

    pub(crate) fn op_ldx<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
        low: u32,
        high: u32,
    ) {
        if self.check_flag(Flag::IndexWidth) {
            self.x = self.read(bus, master, low) as u16;
        } else {
            self.cycles_used += 1;
            self.x = self.read_word(bus, master, low, high);
        }
        self.set_zn(self.x, self.check_flag(Flag::IndexWidth));
    }

    pub(crate) fn op_ldy<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
        low: u32,
        high: u32,
    ) {
        if self.check_flag(Flag::IndexWidth) {
            self.y = self.read(bus, master, low) as u16;
        } else {
            self.cycles_used += 1;
            self.y = self.read_word(bus, master, low, high);
        }
        self.set_zn(self.y, self.check_flag(Flag::IndexWidth));
    }

    pub(crate) fn op_sta<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
        low: u32,
        high: u32,
    ) {
        if self.check_flag(Flag::AccWidth) {
            self.write(bus, master, low, self.a as u8);
        } else {
            self.cycles_used += 1;
            let a = self.a;
            self.write_word(bus, master, low, high, a, false);
        }
    }

    pub(crate) fn op_stx<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
        low: u32,
        high: u32,
    ) {
        if self.check_flag(Flag::IndexWidth) {
            self.write(bus, master, low, self.x as u8);
        } else {
            self.cycles_used += 1;
            let x = self.x;
            self.write_word(bus, master, low, high, x, false);
        }
    }

    pub(crate) fn op_sty<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
        low: u32,
        high: u32,
    ) {
        if self.check_flag(Flag::IndexWidth) {
            self.write(bus, master, low, self.y as u8);
        } else {
            self.cycles_used += 1;
            let y = self.y;
            self.write_word(bus, master, low, high, y, false);
        }
    }

    pub(crate) fn op_stz<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
        low: u32,
        high: u32,
    ) {
        if self.check_flag(Flag::AccWidth) {
            self.write(bus, master, low, 0);
        } else {
            self.cycles_used += 1;
            self.write_word(bus, master, low, high, 0, false);
        }
    }
}
