use crate::analysis::{
    Analysis, Assertion, AssertionType, Cpu, Instruction, JumpTableStatus, Stack, StackData,
    State, StateChange, UnknownReason,
};
use crate::arch::Op;
use crate::rom::tests::{assemble, empty_lorom, rom_from};

fn empty_analysis() -> Analysis {
    Analysis::new(rom_from(empty_lorom()))
}

fn single_instruction(analysis: &Analysis, pc: u32) -> &Instruction {
    let site = analysis
        .instructions_at(pc)
        .expect("instruction site should exist");
    assert_eq!(site.len(), 1);
    site.iter().next().unwrap()
}

/*
 *  State
 */

#[test]
fn default_state_is_eight_bit() {
    let state = State::default();
    assert!(state.m());
    assert!(state.x());
    assert_eq!(state.size_a(), 1);
    assert_eq!(state.size_x(), 1);
}

#[test]
fn state_set_and_reset() {
    let mut state = State::new(0);
    state.set(0x30);
    assert!(state.m());
    assert!(state.x());
    assert_eq!(state.p(), 0x30);

    state.reset(0x20);
    assert!(!state.m());
    assert!(state.x());
    assert_eq!(state.size_a(), 2);
    assert_eq!(state.size_x(), 1);
}

#[test]
fn state_change_set_and_reset_touch_only_masked_flags() {
    let mut change = StateChange::default();
    change.set(0x20);
    assert_eq!(change.m, Some(true));
    assert_eq!(change.x, None);

    change.reset(0x10);
    assert_eq!(change.m, Some(true));
    assert_eq!(change.x, Some(false));
}

#[test]
fn apply_inference_clears_matching_delta() {
    let mut change = StateChange::new(Some(true), Some(false));
    let inference = StateChange::new(Some(true), None);
    change.apply_inference(inference);
    assert_eq!(change.m, None);
    assert_eq!(change.x, Some(false));
}

#[test]
fn simplify_drops_deltas_already_in_state() {
    let change = StateChange::new(Some(true), Some(false));
    let simplified = change.simplify(State::from_flags(true, true));
    assert_eq!(simplified.m, None);
    assert_eq!(simplified.x, Some(false));
}

#[test]
fn state_change_identity() {
    // Known changes compare by their deltas.
    assert_eq!(
        StateChange::new(Some(true), None),
        StateChange::new(Some(true), None)
    );
    assert_ne!(
        StateChange::new(Some(true), None),
        StateChange::new(None, Some(true))
    );

    // Unknown changes compare by reason alone.
    assert_eq!(
        StateChange::unknown(UnknownReason::IndirectJump),
        StateChange::unknown(UnknownReason::IndirectJump)
    );
    assert_ne!(
        StateChange::unknown(UnknownReason::IndirectJump),
        StateChange::unknown(UnknownReason::StackManipulation)
    );
    assert_ne!(
        StateChange::default(),
        StateChange::unknown(UnknownReason::IndirectJump)
    );
}

/*
 *  Instruction
 */

#[test]
fn immediate_size_follows_accumulator_width() {
    // LDA #imm with a 16-bit accumulator.
    let lda = Instruction::new(0x8000, 0x8000, 0xA9, 0x1234, State::from_flags(false, false));
    assert_eq!(lda.argument_size(), 2);
    assert_eq!(lda.size(), 3);
    assert_eq!(lda.argument(), Some(0x1234));

    // Same opcode with an 8-bit accumulator.
    let lda = Instruction::new(0x8000, 0x8000, 0xA9, 0x1234, State::from_flags(true, true));
    assert_eq!(lda.argument_size(), 1);
    assert_eq!(lda.size(), 2);
    assert_eq!(lda.argument(), Some(0x34));
}

#[test]
fn relative_branches_sign_extend() {
    // BNE $F8 from $0006 lands on $0000.
    let bne = Instruction::new(0x0006, 0x8000, 0xD0, 0xF8, State::default());
    assert_eq!(bne.absolute_argument(), Some(0x0000));

    let bne = Instruction::new(0x8000, 0x8000, 0xD0, 0x10, State::default());
    assert_eq!(bne.absolute_argument(), Some(0x8012));

    // BRL with a negative 16-bit displacement.
    let brl = Instruction::new(0x8000, 0x8000, 0x82, 0xFFFD, State::default());
    assert_eq!(brl.absolute_argument(), Some(0x8000));
}

#[test]
fn absolute_arguments_resolve_in_callers_bank() {
    let jsr = Instruction::new(0x81_8000, 0x81_8000, 0x20, 0x9000, State::default());
    assert_eq!(jsr.absolute_argument(), Some(0x81_9000));

    // A data access to an absolute address is bank-ambiguous.
    let sta = Instruction::new(0x81_8000, 0x81_8000, 0x8D, 0x2100, State::default());
    assert_eq!(sta.absolute_argument(), None);

    // Indirect jumps need a jump table.
    let jmp = Instruction::new(0x8000, 0x8000, 0x6C, 0x9000, State::default());
    assert_eq!(jmp.absolute_argument(), None);
}

#[test]
fn argument_strings() {
    let state = State::from_flags(false, false);
    assert_eq!(
        Instruction::new(0x8000, 0x8000, 0xA9, 0x1234, state).to_string(),
        "lda #$1234"
    );
    assert_eq!(
        Instruction::new(0x8000, 0x8000, 0x8D, 0x2100, state).to_string(),
        "sta $2100"
    );
    assert_eq!(
        Instruction::new(0x8000, 0x8000, 0xB1, 0x42, state).to_string(),
        "lda ($42),y"
    );
    assert_eq!(
        Instruction::new(0x8000, 0x8000, 0xA7, 0x42, state).to_string(),
        "lda [$42]"
    );
    assert_eq!(
        Instruction::new(0x8000, 0x8000, 0x54, 0x7F7E, state).to_string(),
        "mvn $7F,$7E"
    );
    assert_eq!(
        Instruction::new(0x8000, 0x8000, 0x60, 0, state).to_string(),
        "rts"
    );
    assert_eq!(
        Instruction::new(0x8000, 0x8000, 0xD3, 0x03, state).to_string(),
        "cmp ($03,s),y"
    );
}

#[test]
fn instruction_identity_ignores_label() {
    let mut a = Instruction::new(0x8000, 0x8000, 0xA9, 0x12, State::default());
    let b = Instruction::new(0x8000, 0x8000, 0xA9, 0x12, State::default());
    a.set_label(Some("loc_008000".to_string()));
    assert_eq!(a, b);

    // A different entry state is a different site.
    let c = Instruction::new(0x8000, 0x8000, 0xA9, 0x12, State::from_flags(false, false));
    assert_ne!(a, c);
}

#[test]
fn control_classification() {
    let classify = |opcode: u8| {
        Instruction::new(0x8000, 0x8000, opcode, 0, State::default()).instruction_type()
    };
    use crate::analysis::InstructionType::*;
    assert_eq!(classify(0x20), Call);
    assert_eq!(classify(0x4C), Jump);
    assert_eq!(classify(0x80), Jump); // BRA
    assert_eq!(classify(0x60), Return);
    assert_eq!(classify(0x00), Interrupt);
    assert_eq!(classify(0xE2), SepRep);
    assert_eq!(classify(0x48), Push);
    assert_eq!(classify(0x68), Pop);
    assert_eq!(classify(0xD0), Branch);
    assert_eq!(classify(0xEA), Other);

    let lda = Instruction::new(0x8000, 0x8000, 0xA9, 0, State::default());
    assert!(lda.changes_a());
    assert!(!lda.is_control());
}

/*
 *  Stack
 */

#[test]
fn push_then_pop_is_lifo() {
    let mut stack = Stack::new();
    assert_eq!(stack.pointer(), 0x100);
    stack.push(None, Some(0x1234), 2);
    assert_eq!(stack.pointer(), 0x100 - 2);

    let entries = stack.pop(2);
    assert_eq!(stack.pointer(), 0x100);
    assert_eq!(entries.len(), 2);
    match (&entries[0].data, &entries[1].data) {
        (StackData::Byte(lo), StackData::Byte(hi)) => {
            assert_eq!(*lo, 0x34);
            assert_eq!(*hi, 0x12);
        }
        other => panic!("unexpected stack data: {:?}", other),
    }
}

#[test]
fn popping_untouched_slots_yields_empty_entries() {
    let mut stack = Stack::new();
    let entry = stack.pop_one();
    assert!(entry.instruction.is_none());
    assert!(matches!(entry.data, StackData::Unknown));
}

#[test]
fn peek_and_match_value() {
    let mut stack = Stack::new();
    stack.push(None, Some(0x8012), 2);

    assert_eq!(stack.peek(2).len(), 2);
    assert!(stack.match_value(2, 0x8012));
    assert!(!stack.match_value(2, 0x8013));

    // Peeking must not consume.
    assert!(stack.match_value(2, 0x8012));

    // Unknown bytes never match.
    stack.push(None, None, 1);
    assert!(!stack.match_value(1, 0x00));
}

#[test]
fn state_snapshots_round_trip() {
    let mut stack = Stack::new();
    let php = Instruction::new(0x8000, 0x8000, 0x08, 0, State::default());
    let state = State::from_flags(false, true);
    let change = StateChange::new(None, Some(true));
    stack.push_state(php, state, change);

    let entry = stack.pop_one();
    match entry.data {
        StackData::SavedState(saved_state, saved_change) => {
            assert_eq!(saved_state, state);
            assert_eq!(saved_change, change);
        }
        other => panic!("unexpected stack data: {:?}", other),
    }
    assert_eq!(entry.instruction.map(|i| i.operation()), Some(Op::PHP));
}

/*
 *  CPU
 */

fn cpu_test_analysis() -> Analysis {
    let mut analysis = empty_analysis();
    analysis.add_subroutine(0x8000, None, false);
    analysis
}

fn run_instruction(cpu: &mut Cpu, opcode: u8, argument: u32) -> Instruction {
    let instruction = Instruction::new(cpu.pc, cpu.subroutine_pc, opcode, argument, cpu.state);
    cpu.execute(&instruction);
    instruction
}

#[test]
fn cpu_takes_branches() {
    let mut analysis = cpu_test_analysis();
    let mut cpu = Cpu::new(&mut analysis, 0x8000, 0x8000, State::new(0));
    cpu.stop = true;

    run_instruction(&mut cpu, 0x90, 0x10); // BCC +$10.
    assert_eq!(cpu.pc, 0x8012);
}

#[test]
fn cpu_registers_called_subroutines() {
    let mut analysis = cpu_test_analysis();
    {
        let mut cpu = Cpu::new(&mut analysis, 0x8000, 0x8000, State::new(0));
        cpu.stop = true;
        run_instruction(&mut cpu, 0x20, 0x9000); // JSR $9000.
        assert_eq!(cpu.pc, 0x8003);
    }
    assert!(analysis.is_subroutine(0x9000));
}

#[test]
fn cpu_stops_on_interrupts() {
    let mut analysis = cpu_test_analysis();
    let mut cpu = Cpu::new(&mut analysis, 0x8000, 0x8000, State::new(0));
    run_instruction(&mut cpu, 0x00, 0x00); // BRK.
    assert!(cpu.stop);
}

#[test]
fn cpu_records_jump_references() {
    let mut analysis = cpu_test_analysis();
    {
        let mut cpu = Cpu::new(&mut analysis, 0x8000, 0x8000, State::new(0));
        cpu.stop = true;
        run_instruction(&mut cpu, 0x4C, 0x9000); // JMP $9000.
        assert_eq!(cpu.pc, 0x9000);
    }
    assert_eq!(analysis.references_to(0x9000), vec![(0x8000, 0x8000)]);
}

#[test]
fn cpu_stops_on_returns() {
    let mut analysis = cpu_test_analysis();
    let mut cpu = Cpu::new(&mut analysis, 0x8000, 0x8000, State::new(0));
    run_instruction(&mut cpu, 0x40, 0x00); // RTI.
    assert!(cpu.stop);
}

#[test]
fn cpu_applies_sep_rep() {
    let mut analysis = cpu_test_analysis();
    let mut cpu = Cpu::new(&mut analysis, 0x8000, 0x8000, State::new(0));
    cpu.stop = true;

    run_instruction(&mut cpu, 0xE2, 0x30); // SEP #$30.
    assert_eq!(cpu.pc, 0x8002);
    assert_eq!(cpu.state.p(), 0x30);
    assert_eq!(cpu.state_change.m, Some(true));
    assert_eq!(cpu.state_change.x, Some(true));

    run_instruction(&mut cpu, 0xC2, 0x30); // REP #$30.
    assert_eq!(cpu.pc, 0x8004);
    assert_eq!(cpu.state.p(), 0x00);
    assert_eq!(cpu.state_change.m, Some(false));
    assert_eq!(cpu.state_change.x, Some(false));
}

#[test]
fn cpu_restores_state_through_php_plp() {
    let mut analysis = cpu_test_analysis();
    let mut cpu = Cpu::new(&mut analysis, 0x8000, 0x8000, State::new(0x30));
    cpu.stop = true;

    run_instruction(&mut cpu, 0x08, 0x00); // PHP.
    run_instruction(&mut cpu, 0xC2, 0x30); // REP #$30.
    assert_eq!(cpu.state.p(), 0x00);

    run_instruction(&mut cpu, 0x28, 0x00); // PLP.
    assert_eq!(cpu.state.p(), 0x30);
    assert!(cpu.state_change.is_empty());
}

#[test]
fn cpu_flags_plp_without_php_as_manipulation() {
    let mut analysis = cpu_test_analysis();
    {
        let mut cpu = Cpu::new(&mut analysis, 0x8000, 0x8000, State::new(0));
        run_instruction(&mut cpu, 0x28, 0x00); // PLP with nothing pushed.
        assert!(cpu.stop);
    }
    let subroutine = &analysis.subroutines()[&0x8000];
    assert!(subroutine.is_unknown_because_of(UnknownReason::StackManipulation));
}

/*
 *  End-to-end scenarios
 */

#[test]
fn infinite_loops_terminate_the_walk() {
    // E1: $8000: JMP $8000.
    let rom = assemble(0x8000, 0x8050, &[(0x8000, &[0x4C, 0x00, 0x80])]);
    let mut analysis = Analysis::new(rom);
    analysis.run();

    // The reset subroutine plus the NMI handler.
    assert_eq!(analysis.subroutines().len(), 2);
    let reset = &analysis.subroutines()[&0x8000];
    assert_eq!(reset.pc(), 0x8000);
    assert!(reset.is_entry_point());
    assert_eq!(reset.instructions().len(), 1);

    let jmp = single_instruction(&analysis, 0x8000);
    assert_eq!(jmp.operation(), Op::JMP);
    assert_eq!(jmp.subroutine_pc(), 0x8000);

    assert_eq!(analysis.references_to(0x8000), vec![(0x8000, 0x8000)]);
}

#[test]
fn state_changes_propagate_to_callers() {
    // E2: the callee widens both registers; the caller's immediates decode
    // as 16-bit afterwards.
    let rom = assemble(
        0x8000,
        0x8050,
        &[
            (
                0x8000,
                &[
                    0xE2, 0x30, // sep #$30
                    0x20, 0x0E, 0x80, // jsr $800E
                    0xA9, 0x34, 0x12, // lda #$1234
                    0xA2, 0x34, 0x12, // ldx #$1234
                    0x4C, 0x0B, 0x80, // jmp $800B
                ][..],
            ),
            (0x800E, &[0xC2, 0x30, 0x60][..]), // rep #$30 : rts
        ],
    );
    let mut analysis = Analysis::new(rom);
    analysis.run();

    assert_eq!(analysis.subroutines().len(), 3);
    let reset = &analysis.subroutines()[&0x8000];
    assert_eq!(reset.instructions().len(), 5);

    let callee = &analysis.subroutines()[&0x800E];
    assert_eq!(callee.label(), "sub_00800E");
    assert_eq!(callee.instructions().len(), 2);
    assert_eq!(callee.known_state_changes().len(), 1);
    assert!(!callee.has_unknown_state_change());
    let change = callee.known_state_changes()[&0x8010];
    assert_eq!(change, StateChange::new(Some(false), Some(false)));
    assert_eq!(callee.state_change_for_pc(0x8010), Some(change));
    assert_eq!(callee.state_change_for_pc(0x800E), None);

    let lda = single_instruction(&analysis, 0x8005);
    assert_eq!(lda.operation(), Op::LDA);
    assert_eq!(lda.argument_size(), 2);
    assert_eq!(lda.argument(), Some(0x1234));
    let ldx = single_instruction(&analysis, 0x8008);
    assert_eq!(ldx.operation(), Op::LDX);
    assert_eq!(ldx.argument_size(), 2);
    assert_eq!(ldx.argument(), Some(0x1234));
}

#[test]
fn inference_elides_state_restoring_sep() {
    // E3: the first immediate read pins m=1 on entry, so the trailing
    // SEP #$20 restores a known value and elides to an empty change.
    let rom = assemble(
        0x8000,
        0x8050,
        &[
            (
                0x8000,
                &[
                    0xE2, 0x30, // sep #$30
                    0x20, 0x0A, 0x80, // jsr $800A
                    0x4C, 0x05, 0x80, // jmp $8005
                ][..],
            ),
            (
                0x800A,
                &[
                    0xA9, 0x12, // lda #$12
                    0xC2, 0x20, // rep #$20
                    0xA9, 0x56, 0x34, // lda #$3456
                    0xE2, 0x20, // sep #$20
                    0xA9, 0x34, // lda #$34
                    0x60, // rts
                ][..],
            ),
        ],
    );
    let mut analysis = Analysis::new(rom);
    analysis.run();

    let callee = &analysis.subroutines()[&0x800A];
    assert_eq!(callee.instructions().len(), 6);
    assert_eq!(callee.known_state_changes().len(), 1);
    let change = callee.known_state_changes()[&0x8015];
    assert!(change.is_empty());
}

#[test]
fn php_plp_preserves_state() {
    // E4: a subroutine that saves and restores the caller's state reports
    // an empty change no matter what it does in between.
    let rom = assemble(
        0x8000,
        0x8050,
        &[
            (
                0x8000,
                &[
                    0xE2, 0x30, // sep #$30
                    0x20, 0x0A, 0x80, // jsr $800A
                    0x4C, 0x05, 0x80, // jmp $8005
                ][..],
            ),
            (
                0x800A,
                &[
                    0x08, // php
                    0xC2, 0x30, // rep #$30
                    0xEA, // nop
                    0x28, // plp
                    0x60, // rts
                ][..],
            ),
        ],
    );
    let mut analysis = Analysis::new(rom);
    analysis.run();

    let reset = &analysis.subroutines()[&0x8000];
    assert_eq!(reset.instructions().len(), 3);
    assert!(!reset.saves_state_in_incipit());

    let callee = &analysis.subroutines()[&0x800A];
    assert_eq!(callee.instructions().len(), 5);
    assert!(callee.saves_state_in_incipit());
    assert_eq!(callee.known_state_changes().len(), 1);
    let change = callee.known_state_changes()[&0x800F];
    assert!(change.is_empty());
}

#[test]
fn jump_tables_resolve_indirect_jumps() {
    // E5: an indirect jump is an unknown until the user bounds its table;
    // a re-run then walks the targets as subroutines.
    let rom = assemble(
        0x8000,
        0x8050,
        &[
            (0x8000, &[0x6C, 0x00, 0x90][..]), // jmp ($9000)
            (0x9000, &[0x00, 0x81, 0x00, 0x82][..]), // dw $8100, $8200
            (0x8100, &[0x4C, 0x00, 0x81][..]), // jmp $8100
            (0x8200, &[0x4C, 0x00, 0x82][..]), // jmp $8200
        ],
    );
    let mut analysis = Analysis::new(rom);
    analysis.run();

    let reset = &analysis.subroutines()[&0x8000];
    assert!(reset.is_unknown_because_of(UnknownReason::IndirectJump));
    let table = analysis.jump_table(0x8000).expect("placeholder table");
    assert_eq!(table.status, JumpTableStatus::Unknown);
    assert!(!analysis.is_subroutine(0x8100));

    analysis.define_jump_table(0x8000, (0, 2), JumpTableStatus::Complete);
    analysis.run();

    assert!(analysis.is_subroutine(0x8100));
    assert!(analysis.is_subroutine(0x8200));
    let reset = &analysis.subroutines()[&0x8000];
    assert!(!reset.has_unknown_state_change());
    // The dispatch site references the target; so does its own loop.
    assert_eq!(
        analysis.references_to(0x8100),
        vec![(0x8000, 0x8000), (0x8100, 0x8100)]
    );

    analysis.undefine_jump_table(0x8000);
    assert!(analysis.jump_table(0x8000).is_none());
}

#[test]
fn manipulated_returns_are_flagged() {
    // E6: a subroutine that pops the return address and pushes its own.
    let rom = assemble(
        0x8000,
        0x8050,
        &[
            (
                0x8000,
                &[
                    0xE2, 0x30, // sep #$30
                    0x20, 0x0A, 0x80, // jsr $800A
                    0x4C, 0x05, 0x80, // jmp $8005
                ][..],
            ),
            (
                0x800A,
                &[
                    0x68, // pla
                    0x68, // pla
                    0xF4, 0x00, 0x82, // pea $8200
                    0x60, // rts
                ][..],
            ),
        ],
    );
    let mut analysis = Analysis::new(rom);
    analysis.run();

    let callee = &analysis.subroutines()[&0x800A];
    assert!(callee.is_unknown_because_of(UnknownReason::StackManipulation));
    assert!(callee.is_responsible_for_unknown());

    // The caller inherits an unknown, but is not responsible for it.
    let reset = &analysis.subroutines()[&0x8000];
    assert!(reset.is_unknown_because_of(UnknownReason::Unknown));
    assert!(!reset.is_responsible_for_unknown());
}

#[test]
fn branches_explore_both_paths() {
    let rom = assemble(
        0x8000,
        0x8050,
        &[(
            0x8000,
            &[
                0xE2, 0x30, // sep #$30
                0xF0, 0x03, // beq $8007
                0x4C, 0x04, 0x80, // jmp $8004
                0x4C, 0x07, 0x80, // jmp $8007
            ][..],
        )],
    );
    let mut analysis = Analysis::new(rom);
    analysis.run();

    let reset = &analysis.subroutines()[&0x8000];
    assert_eq!(reset.instructions().len(), 4);

    // Both the taken edge and the self loop reach $8007.
    assert_eq!(
        analysis.references_to(0x8007),
        vec![(0x8002, 0x8000), (0x8007, 0x8000)]
    );
}

#[test]
fn jumps_into_ram_are_mutable_code() {
    let rom = assemble(0x8000, 0x8050, &[(0x8000, &[0x4C, 0x00, 0x00][..])]);
    let mut analysis = Analysis::new(rom);
    analysis.run();

    let reset = &analysis.subroutines()[&0x8000];
    assert!(reset.is_unknown_because_of(UnknownReason::MutableCode));
}

#[test]
fn conflicting_return_states_stop_the_caller() {
    let rom = assemble(
        0x8000,
        0x8050,
        &[
            (
                0x8000,
                &[
                    0xE2, 0x30, // sep #$30
                    0x20, 0x0A, 0x80, // jsr $800A
                    0x4C, 0x05, 0x80, // jmp $8005
                ][..],
            ),
            (
                0x800A,
                &[
                    0xF0, 0x03, // beq $800F
                    0xC2, 0x20, // rep #$20
                    0x60, // rts
                    0x60, // rts
                ][..],
            ),
        ],
    );
    let mut analysis = Analysis::new(rom);
    analysis.run();

    // One exit widens the accumulator, the other does not.
    let callee = &analysis.subroutines()[&0x800A];
    assert_eq!(callee.known_state_changes().len(), 2);

    let reset = &analysis.subroutines()[&0x8000];
    assert!(reset.is_unknown_because_of(UnknownReason::MultipleReturnStates));
}

#[test]
fn long_calls_pair_with_long_returns() {
    let rom = assemble(
        0x8000,
        0x8050,
        &[
            (0x8000, &[0x22, 0x10, 0x80, 0x00, 0x4C, 0x04, 0x80][..]), // jsl : jmp loop
            (0x8010, &[0x6B][..]),                                     // rtl
        ],
    );
    let mut analysis = Analysis::new(rom);
    analysis.run();

    let callee = &analysis.subroutines()[&0x8010];
    assert_eq!(callee.known_state_changes().len(), 1);
    assert!(!callee.has_unknown_state_change());
}

#[test]
fn short_return_from_long_call_is_manipulation() {
    let rom = assemble(
        0x8000,
        0x8050,
        &[
            (0x8000, &[0x22, 0x10, 0x80, 0x00, 0x4C, 0x04, 0x80][..]), // jsl : jmp loop
            (0x8010, &[0x60][..]),                                     // rts
        ],
    );
    let mut analysis = Analysis::new(rom);
    analysis.run();

    let callee = &analysis.subroutines()[&0x8010];
    assert!(callee.is_unknown_because_of(UnknownReason::StackManipulation));
}

#[test]
fn jump_tables_resolve_indirect_calls() {
    let rom = assemble(
        0x8000,
        0x8050,
        &[
            (0x8000, &[0xFC, 0x00, 0x90, 0x4C, 0x03, 0x80][..]), // jsr ($9000,x) : jmp loop
            (0x9000, &[0x00, 0x81, 0x00, 0x82][..]),             // dw $8100, $8200
            (0x8100, &[0x60][..]),                               // rts
            (0x8200, &[0x60][..]),                               // rts
        ],
    );
    let mut analysis = Analysis::new(rom);
    analysis.run();
    assert!(analysis.subroutines()[&0x8000].is_unknown_because_of(UnknownReason::IndirectJump));

    analysis.define_jump_table(0x8000, (0, 2), JumpTableStatus::Complete);
    analysis.run();

    assert!(analysis.is_subroutine(0x8100));
    assert!(analysis.is_subroutine(0x8200));
    // Both callees return with no changes, so the caller walks on.
    let reset = &analysis.subroutines()[&0x8000];
    assert!(!reset.has_unknown_state_change());
    assert_eq!(reset.instructions().len(), 2);
}

/*
 *  Invariants
 */

#[test]
fn derived_data_is_consistent_after_a_run() {
    let rom = assemble(
        0x8000,
        0x8050,
        &[
            (
                0x8000,
                &[
                    0xE2, 0x30, // sep #$30
                    0x20, 0x0E, 0x80, // jsr $800E
                    0xA9, 0x34, 0x12, // lda #$1234
                    0xA2, 0x34, 0x12, // ldx #$1234
                    0x4C, 0x0B, 0x80, // jmp $800B
                ][..],
            ),
            (0x800E, &[0xC2, 0x30, 0x60][..]),
        ],
    );
    let mut analysis = Analysis::new(rom);
    analysis.run();

    // Every indexed instruction is owned by its subroutine.
    for (pc, site) in analysis.instructions() {
        for instruction in site {
            let subroutine = &analysis.subroutines()[&instruction.subroutine_pc()];
            assert_eq!(subroutine.instructions()[pc].pc(), *pc);
        }
    }

    // Every reference starts at an instruction, within a known subroutine.
    for (source, edges) in analysis.references() {
        assert!(analysis.instructions_at(*source).is_some());
        for edge in edges {
            assert!(analysis.is_subroutine(edge.subroutine_pc));
        }
    }

    // Returning subroutines carry a state change.
    assert!(analysis.subroutines()[&0x800E].has_state_change());
    assert!(analysis.subroutines()[&0x8050].has_state_change());
}

#[test]
fn local_labels_mark_reference_targets_only() {
    let rom = assemble(
        0x8000,
        0x8050,
        &[(
            0x8000,
            &[
                0xE2, 0x30, // sep #$30
                0x4C, 0x02, 0x80, // jmp $8002 (self loop past the sep)
            ][..],
        )],
    );
    let mut analysis = Analysis::new(rom);
    analysis.run();

    let reset = &analysis.subroutines()[&0x8000];
    let target = &reset.instructions()[&0x8002];
    assert_eq!(target.label(), Some("loc_008002"));

    // The label resolves through the query surface, local-label form.
    assert_eq!(
        analysis.get_label(0x8002, Some(0x8000)),
        Some(".loc_008002".to_string())
    );
    // Subroutine entries never get local labels.
    assert_eq!(analysis.get_label(0x8000, None), Some("reset".to_string()));
    assert!(!analysis.is_subroutine(0x8002));
}

#[test]
fn add_instruction_is_idempotent() {
    let mut analysis = cpu_test_analysis();
    let instruction = Instruction::new(0x8000, 0x8000, 0xEA, 0, State::default());

    assert!(analysis.add_instruction(instruction.clone()));
    assert!(!analysis.add_instruction(instruction));
    assert_eq!(analysis.subroutines()[&0x8000].instructions().len(), 1);
    assert_eq!(analysis.instructions_at(0x8000).map(|s| s.len()), Some(1));
}

/*
 *  Assertions
 */

#[test]
fn subroutine_assertions_substitute_the_recorded_change() {
    let rom = assemble(0x8000, 0x8050, &[(0x8000, &[0x6C, 0x00, 0x90][..])]);
    let mut analysis = Analysis::new(rom);
    analysis.add_assertion(
        Assertion {
            assertion_type: AssertionType::Subroutine,
            state_change: StateChange::new(Some(false), None),
        },
        0x8000,
        0x8000,
    );
    analysis.run();

    let reset = &analysis.subroutines()[&0x8000];
    assert!(!reset.has_unknown_state_change());
    assert_eq!(
        reset.known_state_changes()[&0x8000],
        StateChange::new(Some(false), None)
    );

    analysis.remove_assertion(0x8000, 0x8000);
    analysis.run();
    assert!(analysis.subroutines()[&0x8000].is_unknown_because_of(UnknownReason::IndirectJump));
}

#[test]
fn instruction_assertions_let_the_walk_continue() {
    // BRK would normally end the path; an instruction assertion supplies
    // the state after it and the walk carries on in 16-bit mode.
    let rom = assemble(
        0x8000,
        0x8050,
        &[(
            0x8000,
            &[
                0x00, 0x00, // brk
                0xA9, 0x34, 0x12, // lda #$1234
                0x4C, 0x05, 0x80, // jmp $8005
            ][..],
        )],
    );
    let mut analysis = Analysis::new(rom);
    analysis.add_assertion(
        Assertion {
            assertion_type: AssertionType::Instruction,
            state_change: StateChange::new(Some(false), Some(false)),
        },
        0x8000,
        0x8000,
    );
    analysis.run();

    let lda = single_instruction(&analysis, 0x8002);
    assert_eq!(lda.argument_size(), 2);
    assert_eq!(lda.argument(), Some(0x1234));
    assert!(analysis.subroutines()[&0x8000].has_suspect_instructions());
}

/*
 *  User metadata
 */

#[test]
fn custom_labels_take_precedence() {
    let rom = assemble(0x8000, 0x8050, &[(0x8000, &[0x4C, 0x00, 0x80][..])]);
    let mut analysis = Analysis::new(rom);
    analysis.run();

    assert_eq!(analysis.get_label(0x8000, None), Some("reset".to_string()));
    analysis.rename_label("init", 0x8000, None);
    assert_eq!(analysis.get_label(0x8000, None), Some("init".to_string()));
}

#[test]
fn comments_are_user_data() {
    let mut analysis = empty_analysis();
    analysis.set_comment(0x8000, "entry point");
    assert_eq!(analysis.comment(0x8000), Some("entry point"));

    analysis.set_comment(0x8000, "");
    assert_eq!(analysis.comment(0x8000), None);
}

#[test]
fn entry_points_dedupe_by_pc() {
    let mut analysis = empty_analysis();
    let before = analysis.entry_points().len();
    analysis.add_entry_point("extra", 0x9000, State::default());
    analysis.add_entry_point("extra_again", 0x9000, State::default());
    assert_eq!(analysis.entry_points().len(), before + 1);
}

#[test]
fn projects_round_trip_user_data() {
    let rom = assemble(0x8000, 0x8050, &[(0x8000, &[0x6C, 0x00, 0x90][..])]);
    let mut analysis = Analysis::new(rom);
    analysis.set_comment(0x8000, "dispatch");
    analysis.rename_label("dispatcher", 0x8000, None);
    analysis.add_entry_point("irq", 0x8200, State::from_flags(false, false));
    analysis.add_assertion(
        Assertion {
            assertion_type: AssertionType::Subroutine,
            state_change: StateChange::new(Some(true), None),
        },
        0x8000,
        0x8000,
    );
    analysis.run();

    let path = std::env::temp_dir().join(format!("snesdis-project-{}.json", std::process::id()));
    analysis.save(&path).expect("saving should succeed");

    let rom = assemble(0x8000, 0x8050, &[(0x8000, &[0x6C, 0x00, 0x90][..])]);
    let mut restored = Analysis::new(rom);
    restored.load(&path).expect("loading should succeed");
    std::fs::remove_file(&path).ok();

    assert_eq!(restored.comment(0x8000), Some("dispatch"));
    assert_eq!(
        restored.get_label(0x8000, None),
        Some("dispatcher".to_string())
    );
    assert!(restored
        .entry_points()
        .iter()
        .any(|e| e.pc == 0x8200 && e.label == "irq"));
    assert!(restored.assertion(0x8000, 0x8000).is_some());

    // The assertion took effect during the post-load run.
    let reset = &restored.subroutines()[&0x8000];
    assert!(!reset.has_unknown_state_change());
}
