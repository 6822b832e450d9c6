//! Raw `GPRState`/`FPRState` byte layouts for each supported ISA.
//!
//! These mirror the "raw byte image" carried by the `INSTRUCTION` pipe
//! event: a snapshot of general-purpose and floating-point
//! register file state as the producing process's native in-memory layout,
//! little-endian, read/written field by field.

use std::io::{self, Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt, LE};

/// An x87 extended-precision register, decomposed the way the validator
/// compares it: two 32-bit mantissa halves plus the 16-bit exponent/sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct St80 {
    pub m0: u32,
    pub m1: u32,
    pub e: u16,
}

impl St80 {
    fn read(r: &mut impl Read) -> io::Result<Self> {
        let m0 = r.read_u32::<LE>()?;
        let m1 = r.read_u32::<LE>()?;
        let e = r.read_u16::<LE>()?;
        let _reserved = r.read_u16::<LE>()?;
        Ok(St80 { m0, m1, e })
    }

    fn write(&self, w: &mut impl Write) -> io::Result<()> {
        w.write_u32::<LE>(self.m0)?;
        w.write_u32::<LE>(self.m1)?;
        w.write_u16::<LE>(self.e)?;
        w.write_u16::<LE>(0)?;
        Ok(())
    }
}

macro_rules! read_array {
    ($r:expr, $read_one:expr, $n:expr) => {{
        let mut out = [Default::default(); $n];
        for slot in out.iter_mut() {
            *slot = $read_one($r)?;
        }
        out
    }};
}

pub mod arm32 {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GprState {
        /// r0..=r12
        pub r: [u32; 13],
        pub sp: u32,
        pub lr: u32,
        pub cpsr: u32,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct FprState {
        /// s0..=s31
        pub s: [u32; 32],
        pub fpscr: u32,
    }

    impl GprState {
        pub fn read(r: &mut impl Read) -> io::Result<Self> {
            let regs = read_array!(r, |r: &mut dyn Read| r.read_u32::<LE>(), 13);
            Ok(GprState {
                r: regs,
                sp: r.read_u32::<LE>()?,
                lr: r.read_u32::<LE>()?,
                cpsr: r.read_u32::<LE>()?,
            })
        }

        pub fn write(&self, w: &mut impl Write) -> io::Result<()> {
            for v in self.r {
                w.write_u32::<LE>(v)?;
            }
            w.write_u32::<LE>(self.sp)?;
            w.write_u32::<LE>(self.lr)?;
            w.write_u32::<LE>(self.cpsr)?;
            Ok(())
        }
    }

    impl FprState {
        pub fn read(r: &mut impl Read) -> io::Result<Self> {
            let s = read_array!(r, |r: &mut dyn Read| r.read_u32::<LE>(), 32);
            Ok(FprState {
                s,
                fpscr: r.read_u32::<LE>()?,
            })
        }

        pub fn write(&self, w: &mut impl Write) -> io::Result<()> {
            for v in self.s {
                w.write_u32::<LE>(v)?;
            }
            w.write_u32::<LE>(self.fpscr)?;
            Ok(())
        }
    }
}

pub mod aarch64 {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GprState {
        /// x0..=x29
        pub x: [u64; 30],
        pub lr: u64,
        pub sp: u64,
        pub nzcv: u64,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct FprState {
        /// v0..=v31, each a 128-bit lane stored as two little-endian u64 halves `[lo, hi]`.
        pub v: [[u64; 2]; 32],
        pub fpcr: u32,
        pub fpsr: u32,
    }

    impl GprState {
        pub fn read(r: &mut impl Read) -> io::Result<Self> {
            let x = read_array!(r, |r: &mut dyn Read| r.read_u64::<LE>(), 30);
            Ok(GprState {
                x,
                lr: r.read_u64::<LE>()?,
                sp: r.read_u64::<LE>()?,
                nzcv: r.read_u64::<LE>()?,
            })
        }

        pub fn write(&self, w: &mut impl Write) -> io::Result<()> {
            for v in self.x {
                w.write_u64::<LE>(v)?;
            }
            w.write_u64::<LE>(self.lr)?;
            w.write_u64::<LE>(self.sp)?;
            w.write_u64::<LE>(self.nzcv)?;
            Ok(())
        }
    }

    impl FprState {
        pub fn read(r: &mut impl Read) -> io::Result<Self> {
            let mut v = [[0u64; 2]; 32];
            for lane in v.iter_mut() {
                lane[0] = r.read_u64::<LE>()?;
                lane[1] = r.read_u64::<LE>()?;
            }
            Ok(FprState {
                v,
                fpcr: r.read_u32::<LE>()?,
                fpsr: r.read_u32::<LE>()?,
            })
        }

        pub fn write(&self, w: &mut impl Write) -> io::Result<()> {
            for lane in self.v {
                w.write_u64::<LE>(lane[0])?;
                w.write_u64::<LE>(lane[1])?;
            }
            w.write_u32::<LE>(self.fpcr)?;
            w.write_u32::<LE>(self.fpsr)?;
            Ok(())
        }
    }
}

pub mod x86 {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GprState {
        pub eax: u32,
        pub ebx: u32,
        pub ecx: u32,
        pub edx: u32,
        pub esi: u32,
        pub edi: u32,
        pub ebp: u32,
        pub esp: u32,
        pub eflags: u32,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct FprState {
        /// st0..=st7
        pub st: [St80; 8],
        /// xmm0..=xmm7
        pub xmm: [[u8; 16]; 8],
        pub fcw: u16,
        pub fsw: u16,
        pub ftw: u16,
        pub fop: u16,
        pub mxcsr: u32,
        pub mxcsrmask: u32,
    }

    impl GprState {
        pub fn read(r: &mut impl Read) -> io::Result<Self> {
            Ok(GprState {
                eax: r.read_u32::<LE>()?,
                ebx: r.read_u32::<LE>()?,
                ecx: r.read_u32::<LE>()?,
                edx: r.read_u32::<LE>()?,
                esi: r.read_u32::<LE>()?,
                edi: r.read_u32::<LE>()?,
                ebp: r.read_u32::<LE>()?,
                esp: r.read_u32::<LE>()?,
                eflags: r.read_u32::<LE>()?,
            })
        }

        pub fn write(&self, w: &mut impl Write) -> io::Result<()> {
            w.write_u32::<LE>(self.eax)?;
            w.write_u32::<LE>(self.ebx)?;
            w.write_u32::<LE>(self.ecx)?;
            w.write_u32::<LE>(self.edx)?;
            w.write_u32::<LE>(self.esi)?;
            w.write_u32::<LE>(self.edi)?;
            w.write_u32::<LE>(self.ebp)?;
            w.write_u32::<LE>(self.esp)?;
            w.write_u32::<LE>(self.eflags)?;
            Ok(())
        }
    }

    impl FprState {
        pub fn read(r: &mut impl Read) -> io::Result<Self> {
            let mut st = [St80::default(); 8];
            for reg in st.iter_mut() {
                *reg = St80::read(r)?;
            }
            let mut xmm = [[0u8; 16]; 8];
            for lane in xmm.iter_mut() {
                r.read_exact(lane)?;
            }
            Ok(FprState {
                st,
                xmm,
                fcw: r.read_u16::<LE>()?,
                fsw: r.read_u16::<LE>()?,
                ftw: r.read_u16::<LE>()?,
                fop: r.read_u16::<LE>()?,
                mxcsr: r.read_u32::<LE>()?,
                mxcsrmask: r.read_u32::<LE>()?,
            })
        }

        pub fn write(&self, w: &mut impl Write) -> io::Result<()> {
            for reg in self.st {
                reg.write(w)?;
            }
            for lane in self.xmm {
                w.write_all(&lane)?;
            }
            w.write_u16::<LE>(self.fcw)?;
            w.write_u16::<LE>(self.fsw)?;
            w.write_u16::<LE>(self.ftw)?;
            w.write_u16::<LE>(self.fop)?;
            w.write_u32::<LE>(self.mxcsr)?;
            w.write_u32::<LE>(self.mxcsrmask)?;
            Ok(())
        }
    }
}

pub mod x86_64 {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GprState {
        pub rax: u64,
        pub rbx: u64,
        pub rcx: u64,
        pub rdx: u64,
        pub rsi: u64,
        pub rdi: u64,
        pub r8: u64,
        pub r9: u64,
        pub r10: u64,
        pub r11: u64,
        pub r12: u64,
        pub r13: u64,
        pub r14: u64,
        pub r15: u64,
        pub rbp: u64,
        pub rsp: u64,
        pub eflags: u64,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct FprState {
        /// st0..=st7
        pub st: [St80; 8],
        /// xmm0..=xmm15
        pub xmm: [[u8; 16]; 16],
        pub fcw: u16,
        pub fsw: u16,
        pub ftw: u16,
        pub fop: u16,
        pub mxcsr: u32,
        pub mxcsrmask: u32,
    }

    impl GprState {
        pub fn read(r: &mut impl Read) -> io::Result<Self> {
            Ok(GprState {
                rax: r.read_u64::<LE>()?,
                rbx: r.read_u64::<LE>()?,
                rcx: r.read_u64::<LE>()?,
                rdx: r.read_u64::<LE>()?,
                rsi: r.read_u64::<LE>()?,
                rdi: r.read_u64::<LE>()?,
                r8: r.read_u64::<LE>()?,
                r9: r.read_u64::<LE>()?,
                r10: r.read_u64::<LE>()?,
                r11: r.read_u64::<LE>()?,
                r12: r.read_u64::<LE>()?,
                r13: r.read_u64::<LE>()?,
                r14: r.read_u64::<LE>()?,
                r15: r.read_u64::<LE>()?,
                rbp: r.read_u64::<LE>()?,
                rsp: r.read_u64::<LE>()?,
                eflags: r.read_u64::<LE>()?,
            })
        }

        pub fn write(&self, w: &mut impl Write) -> io::Result<()> {
            w.write_u64::<LE>(self.rax)?;
            w.write_u64::<LE>(self.rbx)?;
            w.write_u64::<LE>(self.rcx)?;
            w.write_u64::<LE>(self.rdx)?;
            w.write_u64::<LE>(self.rsi)?;
            w.write_u64::<LE>(self.rdi)?;
            w.write_u64::<LE>(self.r8)?;
            w.write_u64::<LE>(self.r9)?;
            w.write_u64::<LE>(self.r10)?;
            w.write_u64::<LE>(self.r11)?;
            w.write_u64::<LE>(self.r12)?;
            w.write_u64::<LE>(self.r13)?;
            w.write_u64::<LE>(self.r14)?;
            w.write_u64::<LE>(self.r15)?;
            w.write_u64::<LE>(self.rbp)?;
            w.write_u64::<LE>(self.rsp)?;
            w.write_u64::<LE>(self.eflags)?;
            Ok(())
        }
    }

    impl FprState {
        pub fn read(r: &mut impl Read) -> io::Result<Self> {
            let mut st = [St80::default(); 8];
            for reg in st.iter_mut() {
                *reg = St80::read(r)?;
            }
            let mut xmm = [[0u8; 16]; 16];
            for lane in xmm.iter_mut() {
                r.read_exact(lane)?;
            }
            Ok(FprState {
                st,
                xmm,
                fcw: r.read_u16::<LE>()?,
                fsw: r.read_u16::<LE>()?,
                ftw: r.read_u16::<LE>()?,
                fop: r.read_u16::<LE>()?,
                mxcsr: r.read_u32::<LE>()?,
                mxcsrmask: r.read_u32::<LE>()?,
            })
        }

        pub fn write(&self, w: &mut impl Write) -> io::Result<()> {
            for reg in self.st {
                reg.write(w)?;
            }
            for lane in self.xmm {
                w.write_all(&lane)?;
            }
            w.write_u16::<LE>(self.fcw)?;
            w.write_u16::<LE>(self.fsw)?;
            w.write_u16::<LE>(self.ftw)?;
            w.write_u16::<LE>(self.fop)?;
            w.write_u32::<LE>(self.mxcsr)?;
            w.write_u32::<LE>(self.mxcsrmask)?;
            Ok(())
        }
    }
}
