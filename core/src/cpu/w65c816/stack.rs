//! Stack push/pull operations, plus the PEA/PEI/PER address-push family.

use super::{Flag, W65C816};
use crate::core::{Bus, BusMaster};

impl W65C816 {
    pub(crate) fn op_pha<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) {
        if self.check_flag(Flag::AccWidth) {
            let a = self.a as u8;
            self.push_byte(bus, master, a);
        } else {
            self.cycles_used += 1;
            let a = self.a;
            self.push_word(bus, master, a);
        }
    }

    pub(crate) fn op_phx<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) {
        if self.check_flag(Flag::IndexWidth) {
            let x = self.x as u8;
            self.push_byte(bus, master, x);
        } else {
            self.cycles_used += 1;
            let x = self.x;
            self.push_word(bus, master, x);
        }
    }

    pub(crate) fn op_phy<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) {
        if self.check_flag(Flag::IndexWidth) {
            let y = self.y as u8;
            self.push_byte(bus, master, y);
        } else {
            self.cycles_used += 1;
            let y = self.y;
            self.push_word(bus, master, y);
        }
    }

    pub(crate) fn op_phb<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) {
        let db = self.db;
        self.push_byte(bus, master, db);
    }

    pub(crate) fn op_phd<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) {
        let dp = self.dp;
        self.push_word(bus, master, dp);
    }

    pub(crate) fn op_phk<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) {
        let k = self.k;
        self.push_byte(bus, master, k);
    }

    pub(crate) fn op_php<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) {
        let flags = self.flags();
        self.push_byte(bus, master, flags);
    }

    pub(crate) fn op_pla<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) {
        if self.check_flag(Flag::AccWidth) {
            let v = self.pull_byte(bus, master);
            self.a = (self.a & 0xFF00) | v as u16;
        } else {
            self.cycles_used += 1;
            self.a = self.pull_word(bus, master);
        }
        self.set_zn(self.a, self.check_flag(Flag::AccWidth));
    }

    pub(crate) fn op_plx<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) {
        if self.check_flag(Flag::IndexWidth) {
            self.x = self.pull_byte(bus, master) as u16;
        } else {
            self.cycles_used += 1;
            self.x = self.pull_word(bus, master);
        }
        self.set_zn(self.x, self.check_flag(Flag::IndexWidth));
    }

    pub(crate) fn op_ply<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) {
        if self.check_flag(Flag::IndexWidth) {
            self.y = self.pull_byte(bus, master) as u16;
        } else {
            self.cycles_used += 1;
            self.y = self.pull_word(bus, master);
        }
        self.set_zn(self.y, self.check_flag(Flag::IndexWidth));
    }

    pub(crate) fn op_plb<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) {
        self.db = self.pull_byte(bus, master);
        self.set_zn(self.db as u16, true);
    }

    pub(crate) fn op_pld<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) {
        self.dp = self.pull_word(bus, master);
        self.set_zn(self.dp, false);
    }

    pub(crate) fn op_plp<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) {
        let v = self.pull_byte(bus, master);
        self.set_all_flags(v);
    }

    pub(crate) fn op_pea<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) {
        let value = self.read_opcode_word(bus, master);
        self.push_word(bus, master, value);
    }

    pub(crate) fn op_pei<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
        low: u32,
        high: u32,
    ) {
        let value = self.read_word(bus, master, low, high);
        self.push_word(bus, master, value);
    }

    pub(crate) fn op_per<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) {
        let value = self.read_opcode_word(bus, master);
        let target = self.pc.wrapping_add(value);
        self.push_word(bus, master, target);
    }
}
