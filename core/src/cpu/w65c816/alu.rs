//! Width-polymorphic arithmetic/logic operation helpers.
//!
//! Each branches once, at the top, on the M (accumulator) or X (index) flag
//! to do 8- or 16-bit work, per spec.md §9's width-polymorphism note. The
//! 16-bit path always charges one extra cycle.

use super::{Flag, W65C816};
use crate::core::{Bus, BusMaster};

impl W65C816 {
    pub(crate) fn op_and<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
        low: u32,
        high: u32,
    ) {
        if self.check_flag(Flag::AccWidth) {
            let value = self.read(bus, master, low);
            self.a = (self.a & 0xFF00) | ((self.a & value as u16) & 0xFF);
        } else {
            self.cycles_used += 1;
            let value = self.read_word(bus, master, low, high);
            self.a &= value;
        }
        self.set_zn(self.a, self.check_flag(Flag::AccWidth));
    }

    pub(crate) fn op_ora<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
        low: u32,
        high: u32,
    ) {
        if self.check_flag(Flag::AccWidth) {
            let value = self.read(bus, master, low);
            self.a = (self.a & 0xFF00) | ((self.a | value as u16) & 0xFF);
        } else {
            self.cycles_used += 1;
            let value = self.read_word(bus, master, low, high);
            self.a |= value;
        }
        self.set_zn(self.a, self.check_flag(Flag::AccWidth));
    }

    pub(crate) fn op_eor<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
        low: u32,
        high: u32,
    ) {
        if self.check_flag(Flag::AccWidth) {
            let value = self.read(bus, master, low);
            self.a = (self.a & 0xFF00) | ((self.a ^ value as u16) & 0xFF);
        } else {
            self.cycles_used += 1;
            let value = self.read_word(bus, master, low, high);
            self.a ^= value;
        }
        self.set_zn(self.a, self.check_flag(Flag::AccWidth));
    }

    pub(crate) fn op_adc<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
        low: u32,
        high: u32,
    ) {
        let decimal = self.check_flag(Flag::Decimal);
        let carry = self.check_flag(Flag::Carry) as i32;
        if self.check_flag(Flag::AccWidth) {
            let value = self.read(bus, master, low) as i32;
            let mut result;
            if decimal {
                result = (self.a as i32 & 0xF) + (value & 0xF) + carry;
                if result > 0x9 {
                    result = ((result + 0x6) & 0xF) + 0x10;
                }
                result += (self.a as i32 & 0xF0) + (value & 0xF0);
            } else {
                result = (self.a as i32 & 0xFF) + value + carry;
            }
            if (self.a as i32 & 0x80) == (value & 0x80) && (value & 0x80) != (result & 0x80) {
                self.set_flags(Flag::Overflow as u8);
            } else {
                self.clear_flags(Flag::Overflow as u8);
            }
            if decimal && result > 0x9F {
                result += 0x60;
            }
            if result > 0xFF {
                self.set_flags(Flag::Carry as u8);
            } else {
                self.clear_flags(Flag::Carry as u8);
            }
            self.a = (self.a & 0xFF00) | (result as u16 & 0xFF);
        } else {
            self.cycles_used += 1;
            let value = self.read_word(bus, master, low, high) as i32;
            let mut result;
            if decimal {
                result = (self.a as i32 & 0xF) + (value & 0xF) + carry;
                if result > 0x9 {
                    result = ((result + 0x6) & 0xF) + 0x10;
                }
                result += (self.a as i32 & 0xF0) + (value & 0xF0);
                if result > 0x9F {
                    result = ((result + 0x60) & 0xFF) + 0x100;
                }
                result += (self.a as i32 & 0xF00) + (value & 0xF00);
                if result > 0x9FF {
                    result = ((result + 0x600) & 0xFFF) + 0x1000;
                }
                result += (self.a as i32 & 0xF000) + (value & 0xF000);
            } else {
                result = self.a as i32 + value + carry;
            }
            if (self.a as i32 & 0x8000) == (value & 0x8000) && (value & 0x8000) != (result & 0x8000)
            {
                self.set_flags(Flag::Overflow as u8);
            } else {
                self.clear_flags(Flag::Overflow as u8);
            }
            if decimal && result > 0x9FFF {
                result += 0x6000;
            }
            if result > 0xFFFF {
                self.set_flags(Flag::Carry as u8);
            } else {
                self.clear_flags(Flag::Carry as u8);
            }
            self.a = result as u16;
        }
        self.set_zn(self.a, self.check_flag(Flag::AccWidth));
    }

    /// SBC is ADC of the bitwise complement of the operand; the BCD
    /// correction subtracts instead of adds but is otherwise the same
    /// digit-by-digit shape.
    pub(crate) fn op_sbc<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
        low: u32,
        high: u32,
    ) {
        let decimal = self.check_flag(Flag::Decimal);
        let carry = self.check_flag(Flag::Carry) as i32;
        if self.check_flag(Flag::AccWidth) {
            let value = (self.read(bus, master, low) ^ 0xFF) as i32;
            let mut result;
            if decimal {
                result = (self.a as i32 & 0xF) + (value & 0xF) + carry;
                if result < 0x10 {
                    result = if result - 0x6 < 0 {
                        (result - 0x6) & 0xF
                    } else {
                        (result - 0x6) & 0x1F
                    };
                }
                result += (self.a as i32 & 0xF0) + (value & 0xF0);
            } else {
                result = (self.a as i32 & 0xFF) + value + carry;
            }
            if (self.a as i32 & 0x80) == (value & 0x80) && (value & 0x80) != (result & 0x80) {
                self.set_flags(Flag::Overflow as u8);
            } else {
                self.clear_flags(Flag::Overflow as u8);
            }
            if decimal && result < 0x100 {
                result -= 0x60;
            }
            if result > 0xFF {
                self.set_flags(Flag::Carry as u8);
            } else {
                self.clear_flags(Flag::Carry as u8);
            }
            self.a = (self.a & 0xFF00) | (result as u16 & 0xFF);
        } else {
            self.cycles_used += 1;
            let value = (self.read_word(bus, master, low, high) ^ 0xFFFF) as i32;
            let mut result;
            if decimal {
                result = (self.a as i32 & 0xF) + (value & 0xF) + carry;
                if result < 0x10 {
                    result = if result - 0x6 < 0 {
                        (result - 0x6) & 0xF
                    } else {
                        (result - 0x6) & 0x1F
                    };
                }
                result += (self.a as i32 & 0xF0) + (value & 0xF0);
                if result < 0x100 {
                    result = if result - 0x60 < 0 {
                        (result - 0x60) & 0xFF
                    } else {
                        (result - 0x60) & 0x1FF
                    };
                }
                result += (self.a as i32 & 0xF00) + (value & 0xF00);
                if result < 0x1000 {
                    result = if result - 0x600 < 0 {
                        (result - 0x600) & 0xFFF
                    } else {
                        (result - 0x600) & 0x1FFF
                    };
                }
                result += (self.a as i32 & 0xF000) + (value & 0xF000);
            } else {
                result = self.a as i32 + value + carry;
            }
            if (self.a as i32 & 0x8000) == (value & 0x8000) && (value & 0x8000) != (result & 0x8000)
            {
                self.set_flags(Flag::Overflow as u8);
            } else {
                self.clear_flags(Flag::Overflow as u8);
            }
            if decimal && result < 0x10000 {
                result -= 0x6000;
            }
            if result > 0xFFFF {
                self.set_flags(Flag::Carry as u8);
            } else {
                self.clear_flags(Flag::Carry as u8);
            }
            self.a = result as u16;
        }
        self.set_zn(self.a, self.check_flag(Flag::AccWidth));
    }

    pub(crate) fn op_cmp<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
        low: u32,
        high: u32,
    ) {
        let result;
        if self.check_flag(Flag::AccWidth) {
            let value = (self.read(bus, master, low) ^ 0xFF) as i32;
            let r = (self.a as i32 & 0xFF) + value + 1;
            if r > 0xFF {
                self.set_flags(Flag::Carry as u8);
            } else {
                self.clear_flags(Flag::Carry as u8);
            }
            result = r;
        } else {
            self.cycles_used += 1;
            let value = (self.read_word(bus, master, low, high) ^ 0xFFFF) as i32;
            let r = self.a as i32 + value + 1;
            if r > 0xFFFF {
                self.set_flags(Flag::Carry as u8);
            } else {
                self.clear_flags(Flag::Carry as u8);
            }
            result = r;
        }
        self.set_zn(result as u16, self.check_flag(Flag::AccWidth));
    }

    pub(crate) fn op_cpx<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
        low: u32,
        high: u32,
    ) {
        let result;
        if self.check_flag(Flag::IndexWidth) {
            let value = (self.read(bus, master, low) ^ 0xFF) as i32;
            let r = (self.x as i32 & 0xFF) + value + 1;
            if r > 0xFF {
                self.set_flags(Flag::Carry as u8);
            } else {
                self.clear_flags(Flag::Carry as u8);
            }
            result = r;
        } else {
            self.cycles_used += 1;
            let value = (self.read_word(bus, master, low, high) ^ 0xFFFF) as i32;
            let r = self.x as i32 + value + 1;
            if r > 0xFFFF {
                self.set_flags(Flag::Carry as u8);
            } else {
                self.clear_flags(Flag::Carry as u8);
            }
            result = r;
        }
        self.set_zn(result as u16, self.check_flag(Flag::IndexWidth));
    }

    pub(crate) fn op_cpy<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
        low: u32,
        high: u32,
    ) {
        let result;
        if self.check_flag(Flag::IndexWidth) {
            let value = (self.read(bus, master, low) ^ 0xFF) as i32;
            let r = (self.y as i32 & 0xFF) + value + 1;
            if r > 0xFF {
                self.set_flags(Flag::Carry as u8);
            } else {
                self.clear_flags(Flag::Carry as u8);
            }
            result = r;
        } else {
            self.cycles_used += 1;
            let value = (self.read_word(bus, master, low, high) ^ 0xFFFF) as i32;
            let r = self.y as i32 + value + 1;
            if r > 0xFFFF {
                self.set_flags(Flag::Carry as u8);
            } else {
                self.clear_flags(Flag::Carry as u8);
            }
            result = r;
        }
        self.set_zn(result as u16, self.check_flag(Flag::IndexWidth));
    }

    pub(crate) fn op_bit<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
        low: u32,
        high: u32,
    ) {
        if self.check_flag(Flag::AccWidth) {
            let value = self.read(bus, master, low);
            let result = (self.a as u8 & value) == 0;
            self.set_flag_bool(Flag::Zero, result);
            self.set_flag_bool(Flag::Negative, value & 0x80 != 0);
            self.set_flag_bool(Flag::Overflow, value & 0x40 != 0);
        } else {
            self.cycles_used += 1;
            let value = self.read_word(bus, master, low, high);
            let result = (self.a & value) == 0;
            self.set_flag_bool(Flag::Zero, result);
            self.set_flag_bool(Flag::Negative, value & 0x8000 != 0);
            self.set_flag_bool(Flag::Overflow, value & 0x4000 != 0);
        }
    }

    /// BIT#immediate only touches Z (no N/V, since there is no memory byte
    /// to read flags from).
    pub(crate) fn op_bit_immediate<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
        low: u32,
        high: u32,
    ) {
        if self.check_flag(Flag::AccWidth) {
            let value = self.read(bus, master, low);
            self.set_flag_bool(Flag::Zero, (self.a as u8 & value) == 0);
        } else {
            self.cycles_used += 1;
            let value = self.read_word(bus, master, low, high);
            self.set_flag_bool(Flag::Zero, (self.a & value) == 0);
        }
    }

    pub(crate) fn set_flag_bool(&mut self, flag: Flag, set: bool) {
        if set {
            self.set_flags(flag as u8);
        } else {
            self.clear_flags(flag as u8);
        }
    }

    pub(crate) fn op_ror<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
        low: u32,
        high: u32,
    ) {
        let carry;
        let result;
        if self.check_flag(Flag::AccWidth) {
            let value = self.read(bus, master, low);
            carry = value & 1 == 1;
            let r = (value as u32 >> 1) | ((self.check_flag(Flag::Carry) as u32) << 7);
            self.write(bus, master, low, r as u8);
            result = r;
        } else {
            self.cycles_used += 2;
            let value = self.read_word(bus, master, low, high);
            carry = value & 1 == 1;
            let r = (value as u32 >> 1) | ((self.check_flag(Flag::Carry) as u32) << 15);
            self.write_word(bus, master, low, high, r as u16, true);
            result = r;
        }
        self.set_zn(result as u16, self.check_flag(Flag::AccWidth));
        self.set_flag_bool(Flag::Carry, carry);
    }

    pub(crate) fn op_rol<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
        low: u32,
        high: u32,
    ) {
        let result;
        if self.check_flag(Flag::AccWidth) {
            let value = self.read(bus, master, low);
            let r = ((value as u32) << 1) | self.check_flag(Flag::Carry) as u32;
            self.set_flag_bool(Flag::Carry, r & 0x0100 != 0);
            self.write(bus, master, low, r as u8);
            result = r;
        } else {
            self.cycles_used += 2;
            let value = self.read_word(bus, master, low, high);
            let r = ((value as u32) << 1) | self.check_flag(Flag::Carry) as u32;
            self.set_flag_bool(Flag::Carry, r & 0x10000 != 0);
            self.write_word(bus, master, low, high, r as u16, true);
            result = r;
        }
        self.set_zn(result as u16, self.check_flag(Flag::AccWidth));
    }

    pub(crate) fn op_lsr<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
        low: u32,
        high: u32,
    ) {
        let result;
        if self.check_flag(Flag::AccWidth) {
            let value = self.read(bus, master, low);
            self.set_flag_bool(Flag::Carry, value & 1 == 1);
            let r = value >> 1;
            self.write(bus, master, low, r);
            result = r as u16;
        } else {
            self.cycles_used += 2;
            let value = self.read_word(bus, master, low, high);
            self.set_flag_bool(Flag::Carry, value & 1 == 1);
            let r = value >> 1;
            self.write_word(bus, master, low, high, r, true);
            result = r;
        }
        self.set_zn(result, self.check_flag(Flag::AccWidth));
    }

    pub(crate) fn op_asl<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
        low: u32,
        high: u32,
    ) {
        let result;
        if self.check_flag(Flag::AccWidth) {
            let value = self.read(bus, master, low);
            let r = (value as u32) << 1;
            self.set_flag_bool(Flag::Carry, r & 0x0100 != 0);
            self.write(bus, master, low, r as u8);
            result = r;
        } else {
            self.cycles_used += 2;
            let value = self.read_word(bus, master, low, high);
            let r = (value as u32) << 1;
            self.set_flag_bool(Flag::Carry, r & 0x10000 != 0);
            self.write_word(bus, master, low, high, r as u16, true);
            result = r;
        }
        self.set_zn(result as u16, self.check_flag(Flag::AccWidth));
    }

    pub(crate) fn op_inc<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
        low: u32,
        high: u32,
    ) {
        let result;
        if self.check_flag(Flag::AccWidth) {
            let value = self.read(bus, master, low).wrapping_add(1);
            self.write(bus, master, low, value);
            result = value as u16;
        } else {
            self.cycles_used += 2;
            let value = self.read_word(bus, master, low, high).wrapping_add(1);
            self.write_word(bus, master, low, high, value, true);
            result = value;
        }
        self.set_zn(result, self.check_flag(Flag::AccWidth));
    }

    pub(crate) fn op_dec<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
        low: u32,
        high: u32,
    ) {
        let result;
        if self.check_flag(Flag::AccWidth) {
            let value = self.read(bus, master, low).wrapping_sub(1);
            self.write(bus, master, low, value);
            result = value as u16;
        } else {
            self.cycles_used += 2;
            let value = self.read_word(bus, master, low, high).wrapping_sub(1);
            self.write_word(bus, master, low, high, value, true);
            result = value;
        }
        self.set_zn(result, self.check_flag(Flag::AccWidth));
    }

    pub(crate) fn op_tsb<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
        low: u32,
        high: u32,
    ) {
        if self.check_flag(Flag::AccWidth) {
            let value = self.read(bus, master, low);
            self.set_flag_bool(Flag::Zero, (self.a as u8 & value) == 0);
            self.write(bus, master, low, value | (self.a as u8));
        } else {
            self.cycles_used += 2;
            let value = self.read_word(bus, master, low, high);
            self.set_flag_bool(Flag::Zero, (self.a & value) == 0);
            self.write_word(bus, master, low, high, value | self.a, true);
        }
    }

    pub(crate) fn op_trb<B: Bus<Address = u32, Data = u8> + ?Sized>(
        &mut self,
        bus: &mut B,
        master: BusMaster,
        low: u32,
        high: u32,
    ) {
        if self.check_flag(Flag::AccWidth) {
            let value = self.read(bus, master, low);
            self.set_flag_bool(Flag::Zero, (self.a as u8 & value) == 0);
            self.write(bus, master, low, value & !(self.a as u8));
        } else {
            self.cycles_used += 2;
            let value = self.read_word(bus, master, low, high);
            self.set_flag_bool(Flag::Zero, (self.a & value) == 0);
            self.write_word(bus, master, low, high, value & !self.a, true);
        }
    }

    // --- inherent (accumulator-only) shift/inc/dec variants ---

    pub(crate) fn op_asl_a(&mut self) {
        if self.check_flag(Flag::AccWidth) {
            self.set_flag_bool(Flag::Carry, self.a & 0x80 != 0);
            self.a = (self.a & 0xFF00) | ((self.a << 1) & 0xFF);
        } else {
            self.set_flag_bool(Flag::Carry, self.a & 0x8000 != 0);
            self.a <<= 1;
        }
        self.set_zn(self.a, self.check_flag(Flag::AccWidth));
    }

    pub(crate) fn op_rol_a(&mut self) {
        let result = ((self.a as u32) << 1) | self.check_flag(Flag::Carry) as u32;
        if self.check_flag(Flag::AccWidth) {
            self.set_flag_bool(Flag::Carry, result & 0x0100 != 0);
            self.a = (self.a & 0xFF00) | (result as u16 & 0xFF);
        } else {
            self.set_flag_bool(Flag::Carry, result & 0x10000 != 0);
            self.a = result as u16;
        }
        self.set_zn(self.a, self.check_flag(Flag::AccWidth));
    }

    pub(crate) fn op_lsr_a(&mut self) {
        let carry = self.a & 1 != 0;
        if self.check_flag(Flag::AccWidth) {
            self.a = (self.a & 0xFF00) | ((self.a >> 1) & 0x7F);
        } else {
            self.a >>= 1;
        }
        self.set_flag_bool(Flag::Carry, carry);
        self.set_zn(self.a, self.check_flag(Flag::AccWidth));
    }

    pub(crate) fn op_ror_a(&mut self) {
        let carry = self.a & 1 != 0;
        if self.check_flag(Flag::AccWidth) {
            self.a =
                (self.a & 0xFF00) | ((self.a >> 1) & 0x7F) | ((self.check_flag(Flag::Carry) as u16) << 7);
        } else {
            self.a = (self.a >> 1) | ((self.check_flag(Flag::Carry) as u16) << 15);
        }
        self.set_flag_bool(Flag::Carry, carry);
        self.set_zn(self.a, self.check_flag(Flag::AccWidth));
    }

    pub(crate) fn op_inc_a(&mut self) {
        if self.check_flag(Flag::AccWidth) {
            self.a = (self.a & 0xFF00) | ((self.a.wrapping_add(1)) & 0xFF);
        } else {
            self.a = self.a.wrapping_add(1);
        }
        self.set_zn(self.a, self.check_flag(Flag::AccWidth));
    }

    pub(crate) fn op_dec_a(&mut self) {
        if self.check_flag(Flag::AccWidth) {
            self.a = (self.a & 0xFF00) | ((self.a.wrapping_sub(1)) & 0xFF);
        } else {
            self.a = self.a.wrapping_sub(1);
        }
        self.set_zn(self.a, self.check_flag(Flag::AccWidth));
    }

    pub(crate) fn op_inx(&mut self) {
        if self.check_flag(Flag::IndexWidth) {
            self.x = (self.x.wrapping_sub(0).wrapping_add(1)) & 0xFF;
        } else {
            self.x = self.x.wrapping_add(1);
        }
        self.set_zn(self.x, self.check_flag(Flag::IndexWidth));
    }

    pub(crate) fn op_dex(&mut self) {
        if self.check_flag(Flag::IndexWidth) {
            self.x = (self.x.wrapping_sub(1)) & 0xFF;
        } else {
            self.x = self.x.wrapping_sub(1);
        }
        self.set_zn(self.x, self.check_flag(Flag::IndexWidth));
    }

    pub(crate) fn op_iny(&mut self) {
        if self.check_flag(Flag::IndexWidth) {
            self.y = (self.y.wrapping_add(1)) & 0xFF;
        } else {
            self.y = self.y.wrapping_add(1);
        }
        self.set_zn(self.y, self.check_flag(Flag::IndexWidth));
    }

    pub(crate) fn op_dey(&mut self) {
        if self.check_flag(Flag::IndexWidth) {
            self.y = (self.y.wrapping_sub(1)) & 0xFF;
        } else {
            self.y = self.y.wrapping_sub(1);
        }
        self.set_zn(self.y, self.check_flag(Flag::IndexWidth));
    }
}
