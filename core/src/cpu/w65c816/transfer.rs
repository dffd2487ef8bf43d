//! Inter-register transfer operations.

use super::{Flag, W65C816};

impl W65C816 {
    pub(crate) fn op_tax(&mut self) {
        self.x = if self.check_flag(Flag::IndexWidth) {
            self.a & 0xFF
        } else {
            self.a
        };
        self.set_zn(self.x, self.check_flag(Flag::IndexWidth));
    }

    pub(crate) fn op_tay(&mut self) {
        self.y = if self.check_flag(Flag::IndexWidth) {
            self.a & 0xFF
        } else {
            self.a
        };
        self.set_zn(self.y, self.check_flag(Flag::IndexWidth));
    }

    pub(crate) fn op_txa(&mut self) {
        if self.check_flag(Flag::AccWidth) {
            self.a = (self.a & 0xFF00) | (self.x & 0xFF);
        } else {
            self.a = self.x;
        }
        self.set_zn(self.a, self.check_flag(Flag::AccWidth));
    }

    pub(crate) fn op_tya(&mut self) {
        if self.check_flag(Flag::AccWidth) {
            self.a = (self.a & 0xFF00) | (self.y & 0xFF);
        } else {
            self.a = self.y;
        }
        self.set_zn(self.a, self.check_flag(Flag::AccWidth));
    }

    pub(crate) fn op_txy(&mut self) {
        self.y = if self.check_flag(Flag::IndexWidth) {
            self.x & 0xFF
        } else {
            self.x
        };
        self.set_zn(self.y, self.check_flag(Flag::IndexWidth));
    }

    pub(crate) fn op_tyx(&mut self) {
        self.x = if self.check_flag(Flag::IndexWidth) {
            self.y & 0xFF
        } else {
            self.y
        };
        self.set_zn(self.x, self.check_flag(Flag::IndexWidth));
    }

    pub(crate) fn op_tsx(&mut self) {
        self.x = if self.check_flag(Flag::IndexWidth) {
            self.sp & 0xFF
        } else {
            self.sp
        };
        self.set_zn(self.x, self.check_flag(Flag::IndexWidth));
    }

    pub(crate) fn op_txs(&mut self) {
        self.sp = self.x;
    }

    pub(crate) fn op_tcs(&mut self) {
        self.sp = self.a;
    }

    pub(crate) fn op_tsc(&mut self) {
        self.a = self.sp;
        self.set_zn(self.a, false);
    }

    pub(crate) fn op_tcd(&mut self) {
        self.dp = self.a;
        self.set_zn(self.dp, false);
    }

    pub(crate) fn op_tdc(&mut self) {
        self.a = self.dp;
        self.set_zn(self.a, false);
    }

    pub(crate) fn op_xba(&mut self) {
        let lo = self.a & 0xFF;
        let hi = self.a >> 8;
        self.a = (lo << 8) | hi;
        self.set_zn(hi, true);
    }

    /// XCE — exchange Carry and Emulation. Re-derives the M/X-forced,
    /// upper-byte-cleared consequences of entering/leaving emulation mode
    /// via the ordinary flag-write path.
    pub(crate) fn op_xce(&mut self) {
        let carry = self.check_flag(Flag::Carry);
        self.set_flag_bool(Flag::Carry, self.e);
        self.e = carry;
        let flags = self.flags();
        self.set_all_flags(flags);
    }
}
