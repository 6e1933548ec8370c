use crate::error::DecodeError;
use crate::instr::alu::AluOp;
use crate::instr::complex::ComplexInstruction;
use crate::instr::fetch::ByteFetcher;
use crate::instr::immediate::{AccumulatorImmediate, MovRegImmediate};
use crate::instr::modrm::{ModRmFamily, ModRmInstruction};
use crate::instr::stack::StackInstruction;
use crate::instr::Instruction;
use crate::modrm::ModRegRm;
use crate::opcode::Opcode;

/// Decode one instruction from the start of `bytes`.
///
/// The family is selected from the opcode's unique value (D/W bits masked);
/// the family's decoder then pulls whatever MOD-REG-R/M, displacement and
/// immediate bytes it needs.
pub fn decode(bytes: &[u8]) -> Result<Instruction, DecodeError> {
    let mut fetch = ByteFetcher::new(bytes);
    let opcode = Opcode::new(fetch.next_u8()?);
    let value = opcode.value();
    let unknown = DecodeError::UnknownOpcode { opcode: value };

    let inst = match opcode.unique_value() {
        // 00-3F: eight ALU operations, each with four REG/R-M encodings
        // followed by AL/AX, imm (x4, x5). x6/x7 are segment push/pop and
        // prefixes, which are not handled.
        unique @ 0x00..=0x3c => {
            let op = AluOp::from_ext(value >> 3);
            if unique & 0x04 == 0 {
                Instruction::ModRm(ModRmInstruction::decode(
                    ModRmFamily::Alu(op),
                    opcode,
                    &mut fetch,
                )?)
            } else if !opcode.direction_bit() {
                Instruction::AccumulatorImmediate(AccumulatorImmediate::decode(
                    op, opcode, &mut fetch,
                )?)
            } else {
                return Err(unknown);
            }
        }
        0x50..=0x5c => Instruction::Stack(StackInstruction::new(opcode)),
        // 80 /r ib, 81 /r iw, 83 /r ib (sign-extended). 82 is an undocumented alias.
        0x80 if value != 0x82 => {
            let modrm = peek_modrm(bytes)?;
            Instruction::Complex(ComplexInstruction::decode(
                ModRmFamily::Alu(AluOp::from_ext(modrm.reg_bits())),
                opcode,
                value == 0x83,
                &mut fetch,
            )?)
        }
        // 84/85 TEST; 86/87 (XCHG) are not handled.
        0x84 if !opcode.direction_bit() => Instruction::ModRm(ModRmInstruction::decode(
            ModRmFamily::Alu(AluOp::Test),
            opcode,
            &mut fetch,
        )?),
        0x88 => Instruction::ModRm(ModRmInstruction::decode(
            ModRmFamily::Mov,
            opcode,
            &mut fetch,
        )?),
        0x90 if value == 0x90 => Instruction::Nop(opcode),
        0xb0..=0xbc => Instruction::MovRegImmediate(MovRegImmediate::decode(opcode, &mut fetch)?),
        // C6 /0 ib, C7 /0 iw
        0xc4 if opcode.direction_bit() => {
            let modrm = peek_modrm(bytes)?;
            if modrm.reg_bits() != 0 {
                return Err(DecodeError::UnknownExtension {
                    opcode: value,
                    ext: modrm.reg_bits(),
                });
            }
            Instruction::Complex(ComplexInstruction::decode(
                ModRmFamily::Mov,
                opcode,
                false,
                &mut fetch,
            )?)
        }
        0xf4 if value == 0xf4 => Instruction::Hlt(opcode),
        _ => return Err(unknown),
    };

    debug_assert_eq!(inst.raw_size() as usize, fetch.consumed());
    Ok(inst)
}

/// The MOD-REG-R/M byte directly after the opcode, for families whose
/// operation is chosen by its REG field.
fn peek_modrm(bytes: &[u8]) -> Result<ModRegRm, DecodeError> {
    bytes
        .get(1)
        .copied()
        .map(ModRegRm::new)
        .ok_or(DecodeError::UnexpectedEof {
            needed: 2,
            available: bytes.len(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn decodes_alu_register_forms() {
        let inst = decode(&[0x31, 0xc0]).unwrap();
        assert_eq!(inst.to_assembly(), "xor ax, ax");
        let inst = decode(&[0x2a, 0xe1]).unwrap();
        assert_eq!(inst.to_assembly(), "sub ah, cl");
        let inst = decode(&[0x85, 0xdb]).unwrap();
        assert_eq!(inst.to_assembly(), "test bx, bx");
    }

    #[test]
    fn decodes_accumulator_immediates() {
        assert_eq!(decode(&[0x04, 0x05]).unwrap().to_assembly(), "add al, 0x5");
        assert_eq!(
            decode(&[0x2d, 0x00, 0x10]).unwrap().to_assembly(),
            "sub ax, 0x1000"
        );
    }

    #[test]
    fn rejects_unhandled_opcodes() {
        // push es
        assert_eq!(
            decode(&[0x06]),
            Err(DecodeError::UnknownOpcode { opcode: 0x06 })
        );
        // xchg ax, cx
        assert_eq!(
            decode(&[0x91]),
            Err(DecodeError::UnknownOpcode { opcode: 0x91 })
        );
        assert_eq!(
            decode(&[0x86, 0xc0]),
            Err(DecodeError::UnknownOpcode { opcode: 0x86 })
        );
        assert_eq!(
            decode(&[0xc6, 0x08, 0x01]),
            Err(DecodeError::UnknownExtension {
                opcode: 0xc6,
                ext: 1
            })
        );
    }

    #[test]
    fn truncated_input_is_an_error() {
        assert_eq!(
            decode(&[]),
            Err(DecodeError::UnexpectedEof {
                needed: 1,
                available: 0
            })
        );
        // add [bx+si+disp16] needs four bytes.
        assert_eq!(
            decode(&[0x01, 0x80, 0x00]),
            Err(DecodeError::UnexpectedEof {
                needed: 4,
                available: 3
            })
        );
        assert!(matches!(
            decode(&[0x81, 0xc0, 0x01]),
            Err(DecodeError::UnexpectedEof { .. })
        ));
    }

    proptest! {
        #[test]
        fn decode_never_panics_and_raw_data_is_a_prefix(bytes in proptest::collection::vec(any::<u8>(), 0..=8)) {
            if let Ok(inst) = decode(&bytes) {
                let raw = inst.raw_data();
                prop_assert!(!raw.is_empty() && raw.len() <= 6);
                prop_assert_eq!(&bytes[..raw.len()], &raw[..]);
                prop_assert_eq!(inst.raw_size() as usize, raw.len());
            }
        }
    }
}
