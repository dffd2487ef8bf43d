//! Interrupt/flag-control instructions and the block-move opcodes.

use super::{Flag, W65C816};
use crate::core::{Bus, BusMaster};

impl W65C816 {
    pub(crate) fn op_brk<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) {
        let k = self.k;
        self.push_byte(bus, master, k);
        let ret = self.pc.wrapping_add(1);
        self.push_word(bus, master, ret);
        let flags = self.flags();
        self.push_byte(bus, master, flags);
        self.cycles_used += 1;
        self.set_flags(Flag::Irq as u8);
        self.clear_flags(Flag::Decimal as u8);
        self.k = 0;
        self.pc = self.read_word(bus, master, 0xFFE6, 0xFFE7);
    }

    pub(crate) fn op_cop<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) {
        self.read_opcode(bus, master);
        let k = self.k;
        self.push_byte(bus, master, k);
        let pc = self.pc as u8;
        self.push_byte(bus, master, pc);
        let flags = self.flags();
        self.push_byte(bus, master, flags);
        self.cycles_used += 1;
        self.set_flags(Flag::Irq as u8);
        self.clear_flags(Flag::Decimal as u8);
        self.k = 0;
        self.pc = self.read_word(bus, master, 0xFFE4, 0xFFE5);
    }

    pub(crate) fn op_rti<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) {
        let v = self.pull_byte(bus, master);
        self.set_all_flags(v);
        self.cycles_used += 1;
        self.pc = self.pull_word(bus, master);
        self.k = self.pull_byte(bus, master);
    }

    pub(crate) fn op_wai(&mut self) {
        self.waiting = true;
    }

    pub(crate) fn op_stp(&mut self) {
        self.stopped = true;
    }

    pub(crate) fn op_rep<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) {
        let mask = self.read_opcode(bus, master);
        let flags = self.flags();
        self.set_all_flags(flags & !mask);
    }

    pub(crate) fn op_sep<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) {
        let mask = self.read_opcode(bus, master);
        let flags = self.flags();
        self.set_all_flags(flags | mask);
    }

    /// MVP — decrementing block move (source/dest pointers count down).
    pub(crate) fn op_mvp<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) {
        let dest = self.read_opcode(bus, master);
        let src = self.read_opcode(bus, master);
        self.db = dest;
        let value = self.read(bus, master, ((src as u32) << 16) | self.x as u32);
        self.write(bus, master, ((dest as u32) << 16) | self.y as u32, value);
        self.a = self.a.wrapping_sub(1);
        self.x = self.x.wrapping_sub(1);
        self.y = self.y.wrapping_sub(1);
        if self.a != 0xFFFF {
            self.pc = self.pc.wrapping_sub(3);
        }
        if self.check_flag(Flag::IndexWidth) {
            self.x &= 0xFF;
            self.y &= 0xFF;
        }
    }

    /// MVN — incrementing block move.
    pub(crate) fn op_mvn<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) {
        let dest = self.read_opcode(bus, master);
        let src = self.read_opcode(bus, master);
        self.db = dest;
        let value = self.read(bus, master, ((src as u32) << 16) | self.x as u32);
        self.write(bus, master, ((dest as u32) << 16) | self.y as u32, value);
        self.a = self.a.wrapping_sub(1);
        self.x = self.x.wrapping_add(1);
        self.y = self.y.wrapping_add(1);
        if self.a != 0xFFFF {
            self.pc = self.pc.wrapping_sub(3);
        }
        if self.check_flag(Flag::IndexWidth) {
            self.x &= 0xFF;
            self.y &= 0xFF;
        }
    }

    pub(crate) fn op_wdm<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
    ) {
        self.read_opcode(bus, master);
    }

    pub(crate) fn op_clc(&mut self) {
        self.clear_flags(Flag::Carry as u8);
    }

    pub(crate) fn op_sec(&mut self) {
        self.set_flags(Flag::Carry as u8);
    }

    pub(crate) fn op_cli(&mut self) {
        self.clear_flags(Flag::Irq as u8);
    }

    pub(crate) fn op_sei(&mut self) {
        self.set_flags(Flag::Irq as u8);
    }

    pub(crate) fn op_cld(&mut self) {
        self.clear_flags(Flag::Decimal as u8);
    }

    pub(crate) fn op_sed(&mut self) {
        self.set_flags(Flag::Decimal as u8);
    }

    pub(crate) fn op_clv(&mut self) {
        self.clear_flags(Flag::Overflow as u8);
    }
}
