use super::method_from;
use crate::config::{LiteralOccurrence, PatchConfig};
use crate::dex::{Op, OpcodeClass};
use crate::error::PatchError;
use crate::fingerprint::{Fingerprint, Slot};
use crate::literal::{locate_literal, locate_literals};
use crate::patch::BytecodeContext;
use crate::patcher::patch_points;
use crate::registers::RegisterBinding;
use crate::smali_ops::{v, Instruction, MethodRef};
use crate::types::{Modifier, SmaliClass, SmaliMethod};

fn hook() -> MethodRef {
    MethodRef::parse("Lapp/Hooks;->onBind(Landroid/view/View;Z)V").unwrap()
}

fn flag_block(b: &RegisterBinding, flag: &bool) -> Result<Vec<Instruction>, PatchError> {
    Ok(vec![
        Instruction::const4(b.free, i8::from(*flag))?,
        Instruction::invoke_static(vec![b.source, b.free], hook())?,
    ])
}

/// `len` nops with an object load at `i - 1` and a literal load of `0x7f000000 + i` at each `i`.
fn sites(len: usize, at: &[usize]) -> SmaliMethod {
    let mut body = String::new();
    for i in 0..len {
        if at.contains(&i) {
            body.push_str(&format!("const v2, 0x{:x}\n", 0x7f00_0000 + i));
        } else if at.contains(&(i + 1)) {
            body.push_str("iget-object v1, p0, LHost;->view:Landroid/view/View;\n");
        } else {
            body.push_str("nop\n");
        }
    }
    body.push_str("return-void\n");
    method_from("()V", vec![Modifier::Public], 4, &body)
}

fn literal(i: usize) -> i64 {
    0x7f00_0000 + i as i64
}

fn text(m: &SmaliMethod) -> Vec<String> {
    m.instructions().iter().map(|i| i.to_string()).collect()
}

#[test]
fn scenario_three_sites() {
    let mut m = sites(40, &[10, 20, 30]);
    let points = locate_literals(
        &m,
        None,
        &[(literal(10), false), (literal(20), false), (literal(30), true)],
        LiteralOccurrence::First,
    )
    .unwrap();
    assert_eq!(points, vec![(10, false), (20, false), (30, true)]);

    let inserted = patch_points(&mut m, points, true, flag_block).unwrap();
    assert_eq!(inserted, 6);
    assert_eq!(m.len(), 41 + 6);

    let t = text(&m);
    let call = "invoke-static {v1, v2}, Lapp/Hooks;->onBind(Landroid/view/View;Z)V";
    for (block, flag) in [(10, "0x0"), (22, "0x0"), (34, "0x1")] {
        assert_eq!(t[block - 1], "iget-object v1, p0, LHost;->view:Landroid/view/View;");
        assert_eq!(t[block], format!("const/4 v2, {flag}"));
        assert_eq!(t[block + 1], call);
    }
    assert_eq!(t[12], "const v2, 0x7f00000a");
    assert_eq!(t[24], "const v2, 0x7f000014");
    assert_eq!(t[36], "const v2, 0x7f00001e");
}

#[test]
fn point_order_does_not_matter() {
    let at = [2, 5, 8];
    let mut a = sites(12, &at);
    let mut b = a.clone();
    patch_points(&mut a, vec![(5, false), (2, true), (8, false)], true, flag_block).unwrap();
    patch_points(&mut b, vec![(8, false), (5, false), (2, true)], true, flag_block).unwrap();
    assert_eq!(a, b);
}

#[test]
fn indices_below_insertion_are_stable() {
    let mut m = sites(12, &[8]);
    let before: Vec<String> = text(&m)[..8].to_vec();
    patch_points(&mut m, vec![(8, true)], true, flag_block).unwrap();
    assert_eq!(&text(&m)[..8], before.as_slice());
    assert_eq!(m.instructions()[10].literal(), Some(literal(8)));
}

#[test]
fn locator_contract() {
    let m = sites(12, &[4]);
    assert_eq!(locate_literal(&m, None, literal(4), LiteralOccurrence::First), Ok(4));
    assert_eq!(locate_literal(&m, Some(0..4), literal(4), LiteralOccurrence::First).unwrap_err(),
        PatchError::LiteralNotFound { literal: literal(4), method: "run()V".into() });
}

#[test]
fn four_slot_fingerprint_with_validator() {
    let m = method_from(
        "()V",
        vec![Modifier::Public],
        4,
        "
        iget-object v0, p0, LHost;->view:Landroid/view/View;
        const/4 v1, 0x0
        invoke-virtual {v0, v1}, Landroid/view/View;->setVisibility(I)V
        iget-object v2, p0, LHost;->view:Landroid/view/View;
        iget-object v3, p0, LHost;->view:Landroid/view/View;
        const/4 v1, 0x0
        invoke-virtual {v3, v1}, Landroid/view/View;->setVisibility(I)V
        iget-object v3, p0, LHost;->view:Landroid/view/View;
        return-void
        ",
    );
    let fp = Fingerprint::new("SameView")
        .pattern(vec![
            Slot::Class(OpcodeClass::InstanceField),
            Slot::Op(Op::Const4),
            Slot::Class(OpcodeClass::Invoke),
            Slot::Class(OpcodeClass::InstanceField),
        ])
        .validator(|w| w[0].register_a() == w[3].register_a());

    // The first candidate at 0 compares v0 with v2 and is rejected.
    assert_eq!(fp.scan(&m, None), Some(4..8));

    let without = Fingerprint::new("AnyView").pattern(vec![
        Slot::Class(OpcodeClass::InstanceField),
        Slot::Op(Op::Const4),
        Slot::Class(OpcodeClass::Invoke),
        Slot::Class(OpcodeClass::InstanceField),
    ]);
    assert_eq!(without.scan(&m, None), Some(0..4));
}

#[test]
fn label_targets_survive_patching() {
    let mut m = method_from(
        "(Z)V",
        vec![Modifier::Public],
        4,
        "
        if-eqz p1, :cond_0
        iget-object v1, p0, LHost;->view:Landroid/view/View;
        const v2, 0x7f000002
        goto :goto_0
        :cond_0
        iget-object v1, p0, LHost;->view:Landroid/view/View;
        const v2, 0x7f000006
        :goto_0
        return-void
        ",
    );
    patch_points(&mut m, vec![(2, false), (5, true)], true, flag_block).unwrap();
    assert!(m.validate().is_ok());
    let cond = m.label_index(&crate::smali_ops::Label("cond_0".into())).unwrap();
    assert_eq!(m.instructions()[cond].register_a(), Some(v(1)));
    let end = m.label_index(&crate::smali_ops::Label("goto_0".into())).unwrap();
    assert_eq!(m.instructions()[end].op(), Op::ReturnVoid);
    assert_eq!(m.len(), 7 + 4);
}

const HOST: &str = r#"
.class public LHost;
.super Ljava/lang/Object;

.method public bind()V
    .locals 4

    iget-object v1, p0, LHost;->view:Landroid/view/View;
    const v2, 0x7f000001
    invoke-virtual {v1, v2}, Landroid/view/View;->setId(I)V
    const-string v0, "entry"
    iget-object v1, p0, LHost;->view:Landroid/view/View;
    const v2, 0x7f000001
    return-void
.end method
"#;

#[test]
fn literals_are_patched_inside_the_matched_region() {
    let mut bytecode = BytecodeContext::new(vec![SmaliClass::from_smali(HOST).unwrap()], PatchConfig::default());
    let fp = Fingerprint::new("Entry").pattern(vec![
        Slot::Op(Op::ConstString),
        Slot::Class(OpcodeClass::InstanceField),
        Slot::Literal(0x7f00_0001),
    ]);
    let result = bytecode.resolve(&fp).unwrap();
    assert_eq!(result.region(), 3..6);

    let inserted = bytecode.patch_literals(&result, &[(0x7f00_0001, true)], flag_block).unwrap();
    assert_eq!(inserted, 2);

    let t = text(&bytecode.classes[0].methods[0]);
    assert_eq!(t.len(), 7 + 2);
    // the load ahead of the region is left alone
    assert_eq!(t[1], "const v2, 0x7f000001");
    assert_eq!(t[2], "invoke-virtual {v1, v2}, Landroid/view/View;->setId(I)V");
    assert_eq!(t[5], "const/4 v2, 0x1");
    assert_eq!(t[6], "invoke-static {v1, v2}, Lapp/Hooks;->onBind(Landroid/view/View;Z)V");
    assert_eq!(t[7], "const v2, 0x7f000001");
}

#[test]
fn literal_outside_the_matched_region_is_not_found() {
    let mut bytecode = BytecodeContext::new(vec![SmaliClass::from_smali(HOST).unwrap()], PatchConfig::default());
    let fp = Fingerprint::new("Return").pattern(vec![Slot::Op(Op::ReturnVoid)]);
    let result = bytecode.resolve(&fp).unwrap();
    assert_eq!(result.region(), 6..7);

    let err = bytecode.patch_literals(&result, &[(0x7f00_0001, true)], flag_block).unwrap_err();
    assert_eq!(err, PatchError::LiteralNotFound { literal: 0x7f00_0001, method: "bind()V".into() });
    assert_eq!(bytecode.classes[0].methods[0].len(), 7);
}
