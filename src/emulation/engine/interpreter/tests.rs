//! Unit tests for the dispatch engine.
//!
//! Single-instruction tests drive [`Interpreter::step`] against a host entry frame. Everything
//! involving calls, branches or frame discipline runs whole methods registered in a catalog.

use crate::{
    assembly::{Immediate, InstructionAssembler, Operand},
    emulation::{process::EmulationLimits, ErrorKind, HeapRef},
    metadata::{CilFlavor, DomainMethod, DomainType, FieldRef, MethodRef, TypeRef},
};

use super::*;

fn int32() -> TypeRef {
    TypeRef::corelib("System.Int32")
}

fn create_test_interpreter() -> Interpreter {
    let catalog = Arc::new(Catalog::with_corelib().unwrap());
    let mut interpreter = Interpreter::new(catalog, &EmulationConfig::default());
    interpreter.call_stack_mut().push_entry();
    interpreter
}

fn instruction(mnemonic: &str, flow_type: FlowType, operand: Operand) -> Instruction {
    Instruction::new(0, 1, mnemonic, flow_type, operand)
}

fn seq(mnemonic: &str) -> Instruction {
    instruction(mnemonic, FlowType::Sequential, Operand::None)
}

fn push(interpreter: &mut Interpreter, value: EmValue) {
    interpreter.call_stack_mut().current_mut().unwrap().push(value);
}

fn pop(interpreter: &mut Interpreter) -> EmValue {
    interpreter.call_stack_mut().current_mut().unwrap().pop().unwrap()
}

fn root_cause(error: &Error) -> &EmulationError {
    error.as_emulation().unwrap().root_cause()
}

/// Registers a type holding a single static method and returns the method's reference.
fn register_static(
    interpreter: &Interpreter,
    name: &str,
    params: &[TypeRef],
    returns: Option<TypeRef>,
    locals: &[CilFlavor],
    build: impl FnOnce(&mut InstructionAssembler),
) -> MethodRef {
    let mut asm = InstructionAssembler::new();
    build(&mut asm);

    let mut method = DomainMethod::builder("Run").as_static();
    for param in params {
        method = method.param(param.clone());
    }
    if let Some(ty) = returns {
        method = method.returns(ty);
    }
    for local in locals {
        method = method.local(*local);
    }

    let ty = TypeRef::new("Test", format!("Test.{name}"));
    interpreter
        .catalog()
        .register(DomainType::builder(ty.clone()).method(method.body(asm.finish().unwrap())))
        .unwrap();
    MethodRef::new(ty, "Run", params.len())
}

fn run(
    interpreter: &mut Interpreter,
    method_ref: &MethodRef,
    arguments: Vec<EmValue>,
) -> Result<Option<EmValue>> {
    let method = interpreter.catalog().resolve_method(method_ref)?;
    let result = interpreter.invoke(method, arguments);
    if let Ok(Some(_)) = result {
        pop(interpreter);
    }
    result
}

// ============================================================================
// Stack operations and constants
// ============================================================================

#[test]
fn test_nop() {
    let mut interpreter = create_test_interpreter();
    let result = interpreter.step(&seq("nop")).unwrap();
    assert_eq!(result, StepResult::Continue);
    assert!(interpreter.call_stack().current().unwrap().stack().is_empty());
}

#[test]
fn test_dup_and_pop() {
    let mut interpreter = create_test_interpreter();
    push(&mut interpreter, EmValue::I32(42));

    interpreter.step(&seq("dup")).unwrap();
    assert_eq!(interpreter.call_stack().current().unwrap().stack().depth(), 2);

    interpreter.step(&seq("pop")).unwrap();
    assert_eq!(pop(&mut interpreter), EmValue::I32(42));

    let error = interpreter.step(&seq("pop")).unwrap_err();
    assert_eq!(root_cause(&error), &EmulationError::StackUnderflow);
}

#[test]
fn test_ldc_i4_constants() {
    let mut interpreter = create_test_interpreter();
    let cases = [
        ("ldc.i4.m1", -1),
        ("ldc.i4.0", 0),
        ("ldc.i4.1", 1),
        ("ldc.i4.4", 4),
        ("ldc.i4.8", 8),
    ];
    for (mnemonic, expected) in cases {
        interpreter.step(&seq(mnemonic)).unwrap();
        assert_eq!(pop(&mut interpreter), EmValue::I32(expected), "{mnemonic}");
    }

    let short = instruction(
        "ldc.i4.s",
        FlowType::Sequential,
        Operand::Immediate(Immediate::Int8(-5)),
    );
    interpreter.step(&short).unwrap();
    assert_eq!(pop(&mut interpreter), EmValue::I32(-5));

    let long = instruction(
        "ldc.i4",
        FlowType::Sequential,
        Operand::Immediate(Immediate::Int32(100_000)),
    );
    interpreter.step(&long).unwrap();
    assert_eq!(pop(&mut interpreter), EmValue::I32(100_000));

    let missing = instruction("ldc.i4", FlowType::Sequential, Operand::None);
    let error = interpreter.step(&missing).unwrap_err();
    assert!(matches!(
        root_cause(&error),
        EmulationError::InvalidOperand { .. }
    ));
}

// ============================================================================
// Arithmetic, comparison and conversion
// ============================================================================

#[test]
fn test_sub_operand_order() {
    let mut interpreter = create_test_interpreter();
    push(&mut interpreter, EmValue::I32(10));
    push(&mut interpreter, EmValue::I32(3));
    interpreter.step(&seq("sub")).unwrap();
    assert_eq!(pop(&mut interpreter), EmValue::I32(7));
}

#[test]
fn test_div_by_zero() {
    let mut interpreter = create_test_interpreter();
    push(&mut interpreter, EmValue::I32(10));
    push(&mut interpreter, EmValue::I32(0));
    let error = interpreter.step(&seq("div")).unwrap_err();
    assert_eq!(root_cause(&error), &EmulationError::DivideByZero);
}

#[test]
fn test_compare() {
    let mut interpreter = create_test_interpreter();
    push(&mut interpreter, EmValue::I32(5));
    push(&mut interpreter, EmValue::I32(3));
    interpreter.step(&seq("cgt")).unwrap();
    assert_eq!(pop(&mut interpreter), EmValue::I32(1));

    push(&mut interpreter, EmValue::I32(5));
    push(&mut interpreter, EmValue::I32(3));
    interpreter.step(&seq("clt")).unwrap();
    assert_eq!(pop(&mut interpreter), EmValue::I32(0));
}

#[test]
fn test_conversions() {
    let mut interpreter = create_test_interpreter();
    push(&mut interpreter, EmValue::I32(300));
    interpreter.step(&seq("conv.u1")).unwrap();
    assert_eq!(pop(&mut interpreter), EmValue::I32(44));

    push(&mut interpreter, EmValue::I32(200));
    interpreter.step(&seq("conv.i1")).unwrap();
    assert_eq!(pop(&mut interpreter), EmValue::I32(-56));

    push(&mut interpreter, EmValue::I32(-1));
    interpreter.step(&seq("conv.i8")).unwrap();
    assert_eq!(pop(&mut interpreter), EmValue::I64(-1));

    let error = interpreter.step(&seq("conv.ovf.i4")).unwrap_err();
    assert_eq!(
        error.as_emulation().unwrap().kind(),
        ErrorKind::UnsupportedOperation
    );
}

// ============================================================================
// Routing
// ============================================================================

#[test]
fn test_unsupported_mnemonic() {
    let mut interpreter = create_test_interpreter();
    let error = interpreter.step(&seq("mul")).unwrap_err();
    assert_eq!(
        root_cause(&error),
        &EmulationError::UnsupportedOperation {
            mnemonic: "mul".to_string(),
            flow_type: FlowType::Sequential,
        }
    );
}

#[test]
fn test_unsupported_flow_types() {
    let mut interpreter = create_test_interpreter();
    for (mnemonic, flow_type) in [
        ("throw", FlowType::Throw),
        ("break", FlowType::Break),
        ("volatile.", FlowType::Meta),
        ("endfinally", FlowType::Return),
    ] {
        let error = interpreter
            .step(&instruction(mnemonic, flow_type, Operand::None))
            .unwrap_err();
        assert_eq!(
            error.as_emulation().unwrap().kind(),
            ErrorKind::UnsupportedOperation,
            "{mnemonic}"
        );
    }

    let ret = instruction("ret", FlowType::Return, Operand::None);
    assert_eq!(interpreter.step(&ret).unwrap(), StepResult::Return);
}

#[test]
fn test_conditional_branches() {
    let mut interpreter = create_test_interpreter();
    let brtrue = instruction(
        "brtrue.s",
        FlowType::ConditionalBranch,
        Operand::Target(0x20),
    );
    let brfalse = instruction("brfalse", FlowType::ConditionalBranch, Operand::Target(0x20));

    push(&mut interpreter, EmValue::I32(1));
    assert_eq!(
        interpreter.step(&brtrue).unwrap(),
        StepResult::Branch { target: 0x20 }
    );
    push(&mut interpreter, EmValue::I32(0));
    assert_eq!(interpreter.step(&brtrue).unwrap(), StepResult::Continue);

    push(&mut interpreter, EmValue::Null);
    assert_eq!(
        interpreter.step(&brfalse).unwrap(),
        StepResult::Branch { target: 0x20 }
    );
    push(&mut interpreter, EmValue::I32(-7));
    assert_eq!(interpreter.step(&brfalse).unwrap(), StepResult::Continue);

    push(&mut interpreter, EmValue::F64(1.0));
    assert!(interpreter.step(&brtrue).is_err());
}

// ============================================================================
// Whole methods
// ============================================================================

#[test]
fn test_entry_frame_receives_return() {
    let mut interpreter = create_test_interpreter();
    let method_ref = register_static(&interpreter, "Five", &[], Some(int32()), &[], |asm| {
        asm.emit("ldc.i4.2")
            .unwrap()
            .emit("ldc.i4.3")
            .unwrap()
            .emit("add")
            .unwrap()
            .emit("ret")
            .unwrap();
    });

    let method = interpreter.catalog().resolve_method(&method_ref).unwrap();
    let result = interpreter.invoke(method, vec![]).unwrap();
    assert_eq!(result, Some(EmValue::I32(5)));

    assert_eq!(interpreter.call_stack().len(), 1);
    let entry = interpreter.call_stack().current().unwrap();
    assert!(entry.is_entry());
    assert_eq!(entry.stack().peek().unwrap(), &EmValue::I32(5));

    let stats = interpreter.stats();
    assert_eq!(stats.instructions, 4);
    assert_eq!(stats.calls, 1);
    assert_eq!(stats.max_depth, 1);
}

#[test]
fn test_loop_with_locals() {
    let mut interpreter = create_test_interpreter();
    let sum = register_static(
        &interpreter,
        "Sum",
        &[int32()],
        Some(int32()),
        &[CilFlavor::I4, CilFlavor::I4],
        |asm| {
            asm.ldarg(0).unwrap().stloc(1).unwrap();
            asm.label("loop").unwrap();
            asm.ldloc(1).unwrap().branch("brfalse.s", "done").unwrap();
            asm.ldloc(0)
                .unwrap()
                .ldloc(1)
                .unwrap()
                .emit("add")
                .unwrap()
                .stloc(0)
                .unwrap();
            asm.ldloc(1)
                .unwrap()
                .ldc_i4(1)
                .unwrap()
                .emit("sub")
                .unwrap()
                .stloc(1)
                .unwrap();
            asm.branch("br.s", "loop").unwrap();
            asm.label("done").unwrap();
            asm.ldloc(0).unwrap().emit("ret").unwrap();
        },
    );

    let result = run(&mut interpreter, &sum, vec![EmValue::I32(10)]).unwrap();
    assert_eq!(result, Some(EmValue::I32(55)));
    assert_eq!(run(&mut interpreter, &sum, vec![EmValue::I32(0)]).unwrap(), Some(EmValue::I32(0)));
}

#[test]
fn test_local_type_mismatch() {
    let mut interpreter = create_test_interpreter();
    let method_ref = register_static(&interpreter, "Mismatch", &[], None, &[CilFlavor::I4], |asm| {
        asm.ldstr("text").unwrap().stloc(0).unwrap().emit("ret").unwrap();
    });

    let error = run(&mut interpreter, &method_ref, vec![]).unwrap_err();
    assert!(matches!(
        root_cause(&error),
        EmulationError::InvalidOperationTypes { .. }
    ));
}

#[test]
fn test_invalid_branch_target() {
    let mut interpreter = create_test_interpreter();
    let method_ref = register_static(&interpreter, "Jump", &[], None, &[], |asm| {
        asm.emit("nop").unwrap();
        asm.emit_raw(Instruction::new(
            1,
            5,
            "br",
            FlowType::UnconditionalBranch,
            Operand::Target(0x99),
        ));
        asm.emit("ret").unwrap();
    });

    let error = run(&mut interpreter, &method_ref, vec![]).unwrap_err();
    match error.as_emulation().unwrap() {
        EmulationError::InstructionFault {
            offset,
            mnemonic,
            source,
            ..
        } => {
            assert_eq!(*offset, 1);
            assert_eq!(mnemonic, "br");
            assert_eq!(**source, EmulationError::InvalidBranchTarget { target: 0x99 });
        }
        other => panic!("expected an instruction fault, got {other:?}"),
    }
    assert_eq!(interpreter.call_stack().len(), 1);
}

#[test]
fn test_inconsistent_returns() {
    let mut interpreter = create_test_interpreter();
    let void_with_value = register_static(&interpreter, "Leftover", &[], None, &[], |asm| {
        asm.emit("ldc.i4.1").unwrap().emit("ret").unwrap();
    });
    let value_without_return = register_static(&interpreter, "Empty", &[], Some(int32()), &[], |asm| {
        asm.emit("ret").unwrap();
    });

    for method_ref in [void_with_value, value_without_return] {
        let error = run(&mut interpreter, &method_ref, vec![]).unwrap_err();
        assert_eq!(
            error.as_emulation().unwrap().kind(),
            ErrorKind::InconsistentReturn
        );
        assert_eq!(interpreter.call_stack().len(), 1);
    }
}

#[test]
fn test_falls_off_end() {
    let mut interpreter = create_test_interpreter();
    let method_ref = register_static(&interpreter, "NoRet", &[], Some(int32()), &[], |asm| {
        asm.ldc_i4(12).unwrap();
    });
    assert_eq!(
        run(&mut interpreter, &method_ref, vec![]).unwrap(),
        Some(EmValue::I32(12))
    );
}

#[test]
fn test_abstract_method_has_no_body() {
    let mut interpreter = create_test_interpreter();
    let shape = TypeRef::new("Test", "Test.Shape");
    interpreter
        .catalog()
        .register(
            DomainType::builder(shape.clone())
                .method(DomainMethod::builder("Area").as_abstract().returns(int32())),
        )
        .unwrap();

    let area = MethodRef::new(shape, "Area", 0);
    let error = run(&mut interpreter, &area, vec![EmValue::Null]).unwrap_err();
    assert_eq!(
        error.as_emulation().unwrap().kind(),
        ErrorKind::ResolutionFailure
    );
    assert_eq!(interpreter.call_stack().depth(), 0);
}

// ============================================================================
// Objects
// ============================================================================

fn register_point(interpreter: &Interpreter) -> TypeRef {
    let point = TypeRef::new("Test", "Test.Point");
    let x = FieldRef::new(point.clone(), "x");

    let mut set = InstructionAssembler::new();
    set.ldarg(0)
        .unwrap()
        .ldarg(1)
        .unwrap()
        .stfld(x.clone())
        .unwrap()
        .emit("ret")
        .unwrap();
    let mut get = InstructionAssembler::new();
    get.ldarg(0).unwrap().ldfld(x).unwrap().emit("ret").unwrap();
    let mut second = InstructionAssembler::new();
    second.ldarg(2).unwrap().emit("ret").unwrap();

    interpreter
        .catalog()
        .register(
            DomainType::builder(point.clone())
                .field("x", int32())
                .default_constructor()
                .method(
                    DomainMethod::builder("SetX")
                        .param(int32())
                        .body(set.finish().unwrap()),
                )
                .method(
                    DomainMethod::builder("GetX")
                        .returns(int32())
                        .body(get.finish().unwrap()),
                )
                .method(
                    DomainMethod::builder("Second")
                        .param(int32())
                        .returns(int32())
                        .body(second.finish().unwrap()),
                ),
        )
        .unwrap();
    point
}

#[test]
fn test_fields() {
    let mut interpreter = create_test_interpreter();
    let point = register_point(&interpreter);
    let instance = interpreter
        .construct(&MethodRef::constructor(point.clone(), 0), vec![])
        .unwrap();
    let this = EmValue::ObjectRef(instance);

    let get_x = MethodRef::new(point.clone(), "GetX", 0);
    assert_eq!(
        run(&mut interpreter, &get_x, vec![this.clone()]).unwrap(),
        Some(EmValue::I32(0))
    );

    let set_x = MethodRef::new(point.clone(), "SetX", 1);
    run(&mut interpreter, &set_x, vec![this.clone(), EmValue::I32(17)]).unwrap();
    assert_eq!(
        run(&mut interpreter, &get_x, vec![this.clone()]).unwrap(),
        Some(EmValue::I32(17))
    );

    let error = run(&mut interpreter, &get_x, vec![EmValue::Null]).unwrap_err();
    assert_eq!(root_cause(&error), &EmulationError::NullReference);

    let error = run(&mut interpreter, &set_x, vec![this, EmValue::Null]).unwrap_err();
    assert!(matches!(
        root_cause(&error),
        EmulationError::InvalidOperationTypes { .. }
    ));
}

#[test]
fn test_instance_arguments_shift() {
    let mut interpreter = create_test_interpreter();
    let point = register_point(&interpreter);
    let instance = interpreter
        .construct(&MethodRef::constructor(point.clone(), 0), vec![])
        .unwrap();

    // ldarg.2 on a one-parameter instance method is past the end.
    let second = MethodRef::new(point, "Second", 1);
    let error = run(
        &mut interpreter,
        &second,
        vec![EmValue::ObjectRef(instance), EmValue::I32(4)],
    )
    .unwrap_err();
    assert_eq!(
        root_cause(&error),
        &EmulationError::ArgumentIndexOutOfBounds { index: 2, count: 2 }
    );
}

#[test]
fn test_long_form_argument_loads() {
    let mut interpreter = create_test_interpreter();
    let params = vec![int32(); 6];
    let method_ref = register_static(
        &interpreter,
        "Wide",
        &params,
        Some(int32()),
        &[],
        |asm| {
            asm.ldarg(5)
                .unwrap()
                .emit_with("ldarg", Operand::Argument(4))
                .unwrap()
                .emit("sub")
                .unwrap()
                .emit("ret")
                .unwrap();
        },
    );

    let arguments = (1..=6).map(|n| EmValue::I32(n * 10)).collect();
    assert_eq!(
        run(&mut interpreter, &method_ref, arguments).unwrap(),
        Some(EmValue::I32(10))
    );

    let ldarg_s = instruction("ldarg.s", FlowType::Sequential, Operand::Argument(9));
    let error = interpreter.step(&ldarg_s).unwrap_err();
    assert_eq!(
        root_cause(&error),
        &EmulationError::ArgumentIndexOutOfBounds { index: 9, count: 0 }
    );

    let missing = instruction("ldarg", FlowType::Sequential, Operand::None);
    let error = interpreter.step(&missing).unwrap_err();
    assert!(matches!(
        root_cause(&error),
        EmulationError::InvalidOperand { .. }
    ));
}

#[test]
fn test_ldstr_allocates() {
    let mut interpreter = create_test_interpreter();
    let method_ref = register_static(
        &interpreter,
        "Greeting",
        &[],
        Some(TypeRef::string()),
        &[],
        |asm| {
            asm.ldstr("hello").unwrap().emit("ret").unwrap();
        },
    );

    let first = run(&mut interpreter, &method_ref, vec![]).unwrap().unwrap();
    let second = run(&mut interpreter, &method_ref, vec![]).unwrap().unwrap();
    assert_ne!(first, second);

    let heap_ref = first.as_heap_ref().unwrap();
    assert_eq!(&*interpreter.heap().get_string(heap_ref).unwrap(), "hello");
    assert_eq!(interpreter.stats().allocations, 2);
}

#[test]
fn test_stind_ref_copies_string_value() {
    let mut interpreter = create_test_interpreter();
    let method_ref = register_static(
        &interpreter,
        "Assign",
        &[TypeRef::string(), TypeRef::string()],
        None,
        &[],
        |asm| {
            asm.ldarg(0)
                .unwrap()
                .ldarg(1)
                .unwrap()
                .emit("stind.ref")
                .unwrap()
                .emit("ret")
                .unwrap();
        },
    );

    let string_type = interpreter.catalog().resolve_type(&TypeRef::string()).unwrap();
    let destination = interpreter.heap_mut().alloc_string(string_type.clone(), "old");
    let source = interpreter.heap_mut().alloc_string(string_type, "new");

    run(
        &mut interpreter,
        &method_ref,
        vec![EmValue::ObjectRef(destination), EmValue::ObjectRef(source)],
    )
    .unwrap();
    assert_eq!(&*interpreter.heap().get_string(destination).unwrap(), "new");
    assert_eq!(&*interpreter.heap().get_string(source).unwrap(), "new");
}

#[test]
fn test_ldfld_string_payload() {
    let mut interpreter = create_test_interpreter();
    let string_type = interpreter.catalog().resolve_type(&TypeRef::string()).unwrap();
    let text = interpreter.heap_mut().alloc_string(string_type, "hey");

    push(&mut interpreter, EmValue::ObjectRef(text));
    let ldfld = instruction(
        "ldfld",
        FlowType::Sequential,
        Operand::Field(FieldRef::new(TypeRef::string(), "value")),
    );
    interpreter.step(&ldfld).unwrap();
    let payload = pop(&mut interpreter);
    assert_eq!(payload.as_text().map(|t| &**t), Some("hey"));

    // The payload takes part in no arithmetic.
    push(&mut interpreter, payload);
    push(&mut interpreter, EmValue::I32(1));
    let error = interpreter.step(&seq("add")).unwrap_err();
    assert!(matches!(
        root_cause(&error),
        EmulationError::InvalidOperationTypes { .. }
    ));
}

fn register_animals(interpreter: &Interpreter) -> (TypeRef, TypeRef) {
    let animal = TypeRef::new("Test", "Test.Animal");
    let dog = TypeRef::new("Test", "Test.Dog");

    let mut one = InstructionAssembler::new();
    one.ldc_i4(1).unwrap().emit("ret").unwrap();
    let mut two = InstructionAssembler::new();
    two.ldc_i4(2).unwrap().emit("ret").unwrap();

    interpreter
        .catalog()
        .register(
            DomainType::builder(animal.clone()).default_constructor().method(
                DomainMethod::builder("Legs")
                    .as_virtual()
                    .returns(int32())
                    .body(one.finish().unwrap()),
            ),
        )
        .unwrap();
    interpreter
        .catalog()
        .register(
            DomainType::builder(dog.clone())
                .extends(animal.clone())
                .default_constructor()
                .method(
                    DomainMethod::builder("Legs")
                        .as_virtual()
                        .returns(int32())
                        .body(two.finish().unwrap()),
                ),
        )
        .unwrap();
    (animal, dog)
}

#[test]
fn test_isinst() {
    let mut interpreter = create_test_interpreter();
    let (animal, dog) = register_animals(&interpreter);
    let as_animal = register_static(
        &interpreter,
        "AsAnimal",
        &[TypeRef::object()],
        Some(TypeRef::object()),
        &[],
        |asm| {
            asm.ldarg(0).unwrap().isinst(animal.clone()).unwrap().emit("ret").unwrap();
        },
    );
    let as_object = register_static(
        &interpreter,
        "AsObject",
        &[TypeRef::object()],
        Some(TypeRef::object()),
        &[],
        |asm| {
            asm.ldarg(0)
                .unwrap()
                .isinst(TypeRef::object())
                .unwrap()
                .emit("ret")
                .unwrap();
        },
    );

    let rex = EmValue::ObjectRef(
        interpreter
            .construct(&MethodRef::constructor(dog, 0), vec![])
            .unwrap(),
    );
    assert_eq!(
        run(&mut interpreter, &as_animal, vec![rex.clone()]).unwrap(),
        Some(rex)
    );

    let string_type = interpreter.catalog().resolve_type(&TypeRef::string()).unwrap();
    let text = EmValue::ObjectRef(interpreter.heap_mut().alloc_string(string_type, "x"));
    assert_eq!(
        run(&mut interpreter, &as_animal, vec![text]).unwrap(),
        Some(EmValue::Null)
    );
    assert_eq!(
        run(&mut interpreter, &as_animal, vec![EmValue::Null]).unwrap(),
        Some(EmValue::Null)
    );

    let int_type = interpreter.catalog().resolve_type(&int32()).unwrap();
    let array = EmValue::ObjectRef(interpreter.heap_mut().alloc_array(int_type, 2).unwrap());
    assert_eq!(
        run(&mut interpreter, &as_animal, vec![array.clone()]).unwrap(),
        Some(EmValue::Null)
    );
    assert_eq!(
        run(&mut interpreter, &as_object, vec![array.clone()]).unwrap(),
        Some(array)
    );
}

// ============================================================================
// Arrays
// ============================================================================

#[test]
fn test_int_array_round_trip() {
    let mut interpreter = create_test_interpreter();
    let method_ref = register_static(
        &interpreter,
        "Array",
        &[],
        Some(int32()),
        &[CilFlavor::Array],
        |asm| {
            asm.ldc_i4(3).unwrap().newarr(int32()).unwrap().stloc(0).unwrap();
            asm.ldloc(0)
                .unwrap()
                .ldc_i4(1)
                .unwrap()
                .ldc_i4(42)
                .unwrap()
                .emit("stelem.i4")
                .unwrap();
            asm.ldloc(0)
                .unwrap()
                .ldc_i4(1)
                .unwrap()
                .emit("ldelem.i4")
                .unwrap();
            asm.ldloc(0)
                .unwrap()
                .emit("ldlen")
                .unwrap()
                .emit("add")
                .unwrap()
                .emit("ret")
                .unwrap();
        },
    );

    assert_eq!(
        run(&mut interpreter, &method_ref, vec![]).unwrap(),
        Some(EmValue::I32(45))
    );
}

#[test]
fn test_narrow_elements() {
    let mut interpreter = create_test_interpreter();
    let byte_type = interpreter
        .catalog()
        .resolve_type(&TypeRef::corelib("System.SByte"))
        .unwrap();
    let array = interpreter.heap_mut().alloc_array(byte_type, 2).unwrap();
    let array_value = EmValue::ObjectRef(array);

    push(&mut interpreter, array_value.clone());
    push(&mut interpreter, EmValue::I32(0));
    push(&mut interpreter, EmValue::I32(200));
    interpreter.step(&seq("stelem.i1")).unwrap();

    push(&mut interpreter, array_value.clone());
    push(&mut interpreter, EmValue::I32(0));
    interpreter.step(&seq("ldelem.i1")).unwrap();
    assert_eq!(pop(&mut interpreter), EmValue::I32(-56));

    push(&mut interpreter, array_value);
    push(&mut interpreter, EmValue::I32(2));
    let error = interpreter.step(&seq("ldelem.i1")).unwrap_err();
    assert_eq!(
        root_cause(&error),
        &EmulationError::ArrayIndexOutOfBounds {
            index: 2,
            length: 2
        }
    );
}

#[test]
fn test_newarr_negative_length() {
    let mut interpreter = create_test_interpreter();
    push(&mut interpreter, EmValue::I32(-1));
    let newarr = instruction("newarr", FlowType::Sequential, Operand::Type(int32()));
    let error = interpreter.step(&newarr).unwrap_err();
    assert!(matches!(
        root_cause(&error),
        EmulationError::ArrayIndexOutOfBounds { index: -1, .. }
    ));
}

#[test]
fn test_newarr_length_ceiling() {
    let mut interpreter = create_test_interpreter();
    let newarr = instruction("newarr", FlowType::Sequential, Operand::Type(TypeRef::object()));

    for count in [1_i64 << 60, i64::from(i32::MAX) + 1] {
        push(&mut interpreter, EmValue::I64(count));
        let error = interpreter.step(&newarr).unwrap_err();
        assert_eq!(
            root_cause(&error),
            &EmulationError::ArrayTooLarge { length: count }
        );
        assert_eq!(root_cause(&error).kind(), ErrorKind::InvalidProgram);
    }
    assert!(interpreter.heap().is_empty());

    push(&mut interpreter, EmValue::I64(2));
    interpreter.step(&newarr).unwrap();
    let array = pop(&mut interpreter).as_heap_ref().unwrap();
    assert_eq!(interpreter.heap().array_length(array).unwrap(), 2);
}

#[test]
fn test_reference_elements_materialize_once() {
    let mut interpreter = create_test_interpreter();
    let (_, dog) = register_animals(&interpreter);
    let object_array = TypeRef::object();
    let get = register_static(
        &interpreter,
        "Get",
        &[object_array.clone()],
        Some(TypeRef::object()),
        &[],
        |asm| {
            asm.ldarg(0)
                .unwrap()
                .ldc_i4(0)
                .unwrap()
                .emit("ldelem.ref")
                .unwrap()
                .emit("ret")
                .unwrap();
        },
    );
    let set = register_static(
        &interpreter,
        "Set",
        &[object_array.clone(), TypeRef::object()],
        None,
        &[],
        |asm| {
            asm.ldarg(0)
                .unwrap()
                .ldc_i4(0)
                .unwrap()
                .ldarg(1)
                .unwrap()
                .emit("stelem.ref")
                .unwrap()
                .emit("ret")
                .unwrap();
        },
    );

    let dog_type = interpreter.catalog().resolve_type(&dog).unwrap();
    let array = EmValue::ObjectRef(interpreter.heap_mut().alloc_array(dog_type, 1).unwrap());
    let before = interpreter.heap().len();

    let first = run(&mut interpreter, &get, vec![array.clone()]).unwrap().unwrap();
    let again = run(&mut interpreter, &get, vec![array.clone()]).unwrap().unwrap();
    assert_eq!(first, again);
    assert_eq!(interpreter.heap().len(), before + 1);

    let heap_ref: HeapRef = first.as_heap_ref().unwrap();
    assert_eq!(interpreter.heap().type_of(heap_ref).unwrap().type_ref(), &dog);

    // Clearing the slot makes the next read materialize a fresh instance.
    run(&mut interpreter, &set, vec![array.clone(), EmValue::Null]).unwrap();
    let fresh = run(&mut interpreter, &get, vec![array]).unwrap().unwrap();
    assert_ne!(fresh, first);
}

#[test]
fn test_stelem_ref_stores_handle() {
    let mut interpreter = create_test_interpreter();
    let (_, dog) = register_animals(&interpreter);
    let dog_type = interpreter.catalog().resolve_type(&dog).unwrap();
    let array = EmValue::ObjectRef(interpreter.heap_mut().alloc_array(dog_type, 2).unwrap());
    let rex = interpreter
        .construct(&MethodRef::constructor(dog, 0), vec![])
        .unwrap();
    let before = interpreter.heap().len();

    push(&mut interpreter, array.clone());
    push(&mut interpreter, EmValue::I32(1));
    push(&mut interpreter, EmValue::ObjectRef(rex));
    interpreter.step(&seq("stelem.ref")).unwrap();

    push(&mut interpreter, array);
    push(&mut interpreter, EmValue::I32(1));
    interpreter.step(&seq("ldelem.ref")).unwrap();
    assert_eq!(pop(&mut interpreter), EmValue::ObjectRef(rex));
    assert_eq!(interpreter.heap().len(), before);
}

#[test]
fn test_ldelema_materializes_like_ldelem_ref() {
    let mut interpreter = create_test_interpreter();
    let (_, dog) = register_animals(&interpreter);
    let dog_type = interpreter.catalog().resolve_type(&dog).unwrap();
    let array = EmValue::ObjectRef(interpreter.heap_mut().alloc_array(dog_type, 1).unwrap());
    let ldelema = instruction("ldelema", FlowType::Sequential, Operand::Type(dog.clone()));

    push(&mut interpreter, array.clone());
    push(&mut interpreter, EmValue::I32(0));
    interpreter.step(&ldelema).unwrap();
    let slot = pop(&mut interpreter);
    let heap_ref = slot.as_heap_ref().unwrap();
    assert_eq!(interpreter.heap().type_of(heap_ref).unwrap().type_ref(), &dog);

    push(&mut interpreter, array);
    push(&mut interpreter, EmValue::I32(0));
    interpreter.step(&seq("ldelem.ref")).unwrap();
    assert_eq!(pop(&mut interpreter), slot);
}

// ============================================================================
// Calls
// ============================================================================

#[test]
fn test_call_and_callvirt() {
    let mut interpreter = create_test_interpreter();
    let (animal, dog) = register_animals(&interpreter);
    let legs = MethodRef::new(animal.clone(), "Legs", 0);

    let virtual_legs = register_static(
        &interpreter,
        "VirtualLegs",
        &[animal.clone()],
        Some(int32()),
        &[],
        |asm| {
            asm.ldarg(0).unwrap().callvirt(legs.clone()).unwrap().emit("ret").unwrap();
        },
    );
    let direct_legs = register_static(
        &interpreter,
        "DirectLegs",
        &[animal.clone()],
        Some(int32()),
        &[],
        |asm| {
            asm.ldarg(0).unwrap().call(legs.clone()).unwrap().emit("ret").unwrap();
        },
    );

    let rex = EmValue::ObjectRef(
        interpreter
            .construct(&MethodRef::constructor(dog, 0), vec![])
            .unwrap(),
    );
    assert_eq!(
        run(&mut interpreter, &virtual_legs, vec![rex.clone()]).unwrap(),
        Some(EmValue::I32(2))
    );
    assert_eq!(
        run(&mut interpreter, &direct_legs, vec![rex]).unwrap(),
        Some(EmValue::I32(1))
    );
    assert_eq!(interpreter.dispatch().cached(), 1);

    let error = run(&mut interpreter, &virtual_legs, vec![EmValue::Null]).unwrap_err();
    assert_eq!(root_cause(&error), &EmulationError::NullReference);
    assert_eq!(interpreter.call_stack().len(), 1);
}

#[test]
fn test_newobj_runs_constructor() {
    let mut interpreter = create_test_interpreter();
    let counter = TypeRef::new("Test", "Test.Counter");
    let value = FieldRef::new(counter.clone(), "value");

    let mut ctor = InstructionAssembler::new();
    ctor.ldarg(0)
        .unwrap()
        .ldarg(1)
        .unwrap()
        .stfld(value.clone())
        .unwrap()
        .emit("ret")
        .unwrap();
    interpreter
        .catalog()
        .register(
            DomainType::builder(counter.clone())
                .field("value", int32())
                .method(
                    DomainMethod::constructor()
                        .param(int32())
                        .body(ctor.finish().unwrap()),
                ),
        )
        .unwrap();

    let make = register_static(&interpreter, "Make", &[], Some(int32()), &[], |asm| {
        asm.ldc_i4(9)
            .unwrap()
            .newobj(MethodRef::constructor(counter.clone(), 1))
            .unwrap()
            .ldfld(value.clone())
            .unwrap()
            .emit("ret")
            .unwrap();
    });

    assert_eq!(
        run(&mut interpreter, &make, vec![]).unwrap(),
        Some(EmValue::I32(9))
    );
    assert_eq!(interpreter.stats().max_depth, 2);
}

#[test]
fn test_native_call() {
    let mut interpreter = create_test_interpreter();
    let concat = MethodRef::new(TypeRef::string(), "Concat", 2);
    let method_ref = register_static(
        &interpreter,
        "Join",
        &[],
        Some(TypeRef::string()),
        &[],
        |asm| {
            asm.ldstr("ab")
                .unwrap()
                .ldstr("cd")
                .unwrap()
                .call(concat.clone())
                .unwrap()
                .emit("ret")
                .unwrap();
        },
    );

    let result = run(&mut interpreter, &method_ref, vec![]).unwrap().unwrap();
    let heap_ref = result.as_heap_ref().unwrap();
    assert_eq!(&*interpreter.heap().get_string(heap_ref).unwrap(), "abcd");
    assert_eq!(interpreter.stats().native_calls, 1);
    assert_eq!(interpreter.stats().allocations, 3);
}

#[test]
fn test_unresolved_call() {
    let mut interpreter = create_test_interpreter();
    let missing = MethodRef::new(TypeRef::new("Test", "Test.Missing"), "Gone", 0);
    let method_ref = register_static(&interpreter, "CallsMissing", &[], None, &[], |asm| {
        asm.call(missing.clone()).unwrap().emit("ret").unwrap();
    });

    let error = run(&mut interpreter, &method_ref, vec![]).unwrap_err();
    let emulation = error.as_emulation().unwrap();
    assert!(emulation.is_located());
    assert_eq!(emulation.kind(), ErrorKind::ResolutionFailure);
}

fn register_recursion(interpreter: &Interpreter) -> MethodRef {
    let ty = TypeRef::new("Test", "Test.Recursion");
    let recurse = MethodRef::new(ty.clone(), "Down", 1);

    let mut asm = InstructionAssembler::new();
    asm.ldarg(0).unwrap().branch("brfalse.s", "done").unwrap();
    asm.ldarg(0)
        .unwrap()
        .ldc_i4(1)
        .unwrap()
        .emit("sub")
        .unwrap()
        .call(recurse.clone())
        .unwrap()
        .emit("ret")
        .unwrap();
    asm.label("done").unwrap();
    asm.ldc_i4(0).unwrap().emit("ret").unwrap();

    interpreter
        .catalog()
        .register(
            DomainType::builder(ty).method(
                DomainMethod::builder("Down")
                    .as_static()
                    .param(int32())
                    .returns(int32())
                    .body(asm.finish().unwrap()),
            ),
        )
        .unwrap();
    recurse
}

#[test]
fn test_call_depth_limit() {
    let mut interpreter = create_test_interpreter();
    let recurse = register_recursion(&interpreter);

    // Down(24) nests 25 frames.
    assert_eq!(
        run(&mut interpreter, &recurse, vec![EmValue::I32(24)]).unwrap(),
        Some(EmValue::I32(0))
    );
    assert_eq!(interpreter.stats().max_depth, 25);

    let error = run(&mut interpreter, &recurse, vec![EmValue::I32(25)]).unwrap_err();
    assert_eq!(
        root_cause(&error),
        &EmulationError::StackDepthExceeded {
            depth: 26,
            limit: 25
        }
    );
    assert_eq!(interpreter.call_stack().len(), 1);
    assert_eq!(interpreter.call_stack().depth(), 0);
}

#[test]
fn test_configured_depth_limit() {
    let catalog = Arc::new(Catalog::with_corelib().unwrap());
    let config = EmulationConfig::default().with_limits(EmulationLimits::new().with_max_call_depth(3));
    let mut interpreter = Interpreter::new(catalog, &config);
    interpreter.call_stack_mut().push_entry();
    let recurse = register_recursion(&interpreter);

    assert!(run(&mut interpreter, &recurse, vec![EmValue::I32(2)]).is_ok());
    let error = run(&mut interpreter, &recurse, vec![EmValue::I32(3)]).unwrap_err();
    assert_eq!(
        error.as_emulation().unwrap().kind(),
        ErrorKind::StackDepthExceeded
    );
}
