//! Inserting instruction blocks into a method.
//!
//! Multi-point patches are applied from the highest index down, so inserting at one point
//! never moves a point that is still pending.

use crate::error::PatchError;
use crate::registers::{bind, RegisterBinding};
use crate::smali_ops::{parse_block, Instruction};
use crate::types::SmaliMethod;
use log::debug;

impl SmaliMethod {
    /// Inserts `block` in front of the instruction at `index`; `index == len` appends.
    ///
    /// Labels and debug directives bound at `index` or later stay with the same instruction,
    /// so the new block is only reached by falling through from `index - 1`.
    pub fn add_instructions(&mut self, index: usize, block: Vec<Instruction>) -> Result<(), PatchError> {
        if index > self.len() {
            return Err(PatchError::IndexOutOfBounds { index, len: self.len() });
        }
        self.check_block(&block)?;
        self.splice(index, block);
        Ok(())
    }

    /// Like [`SmaliMethod::add_instructions`] with the block written as smali.
    ///
    /// # Examples
    ///
    /// ```
    ///  use smali_patcher::types::{MethodSignature, SmaliMethod};
    ///
    ///  let sig = MethodSignature::from_jni("(Landroid/view/View;)V").unwrap();
    ///  let mut m = SmaliMethod::new("hide", vec![], sig, 1);
    ///  m.add_smali(0, "
    ///      const/4 v0, 0x8
    ///      invoke-virtual {p1, v0}, Landroid/view/View;->setVisibility(I)V
    ///  ").unwrap();
    ///  assert_eq!(m.len(), 2);
    /// ```
    pub fn add_smali(&mut self, index: usize, smali: &str) -> Result<(), PatchError> {
        let block = parse_block(smali)?;
        self.add_instructions(index, block)
    }

    /// Checks that every register in `block` exists in this method's frame and that its raw
    /// number fits the instruction format.
    pub fn check_block(&self, block: &[Instruction]) -> Result<(), PatchError> {
        self.check_frame(block)?;
        for insn in block {
            insn.check_raw_registers(|r| self.raw_register(r))?;
        }
        Ok(())
    }

    /// Checks only that every register in `block` exists in this method's frame.
    pub fn check_frame(&self, block: &[Instruction]) -> Result<(), PatchError> {
        let missing = block.iter().flat_map(|i| i.registers()).find(|r| !self.has_register(**r));
        match missing {
            Some(register) => Err(PatchError::InvalidRegister {
                register: *register,
                frame: format!("{} locals, {} ins", self.locals, self.ins_size()),
            }),
            None => Ok(()),
        }
    }

    fn splice(&mut self, index: usize, block: Vec<Instruction>) {
        let count = block.len();
        let bindings = self.labels.iter_mut().map(|(_, i)| i).chain(self.debug.iter_mut().map(|(_, i)| i));
        for bound in bindings.filter(|i| **i >= index) {
            *bound += count;
        }
        self.instructions.splice(index..index, block);
    }
}

/// Inserts one synthesized block per patch point and returns the number of instructions added.
///
/// Points are sorted descending and their bindings and blocks all computed before the first
/// insertion, so on error the method is left as it was. Two points with the same index are
/// rejected.
///
/// Every block must only name registers of the method frame. `raw_widths` additionally checks
/// each register's raw number against the width of its instruction format.
pub fn patch_points<T, F>(
    method: &mut SmaliMethod,
    mut points: Vec<(usize, T)>,
    raw_widths: bool,
    mut synthesize: F,
) -> Result<usize, PatchError>
where
    F: FnMut(&RegisterBinding, &T) -> Result<Vec<Instruction>, PatchError>,
{
    points.sort_by(|a, b| b.0.cmp(&a.0));
    if let Some(w) = points.windows(2).find(|w| w[0].0 == w[1].0) {
        return Err(PatchError::DuplicatePatchPoint { index: w[0].0 });
    }

    let mut blocks = Vec::with_capacity(points.len());
    for (index, value) in &points {
        let binding = bind(method, *index)?;
        let block = synthesize(&binding, value)?;
        if raw_widths {
            method.check_block(&block)?;
        } else {
            method.check_frame(&block)?;
        }
        blocks.push((*index, block));
    }

    let mut inserted = 0;
    for (index, block) in blocks {
        debug!("[patcher] {} instructions at {} in {}", block.len(), index, method.id());
        inserted += block.len();
        method.splice(index, block);
    }
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smali_ops::{p, v, Label, MethodRef};
    use crate::types::MethodSignature;

    fn method(body: &str) -> SmaliMethod {
        let sig = MethodSignature::from_jni("(I)V").unwrap();
        let mut m = SmaliMethod::new("run", vec![], sig, 4);
        for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(label) = line.strip_prefix(':') {
                m.push_label(Label(label.to_string()));
            } else {
                m.push(line.parse().unwrap());
            }
        }
        m
    }

    #[test]
    fn insert_shifts_later_labels() {
        let mut m = method(
            "
            if-eqz p1, :cond_0
            const/4 v0, 0x1
            :cond_0
            return-void
            ",
        );
        m.add_smali(2, "const/4 v1, 0x0").unwrap();
        assert_eq!(m.len(), 4);
        assert_eq!(m.label_index(&Label("cond_0".into())), Some(3));
        assert_eq!(m.instructions()[3].to_string(), "return-void");
        assert!(m.validate().is_ok());
    }

    #[test]
    fn append_at_end() {
        let mut m = method("const/4 v0, 0x1");
        m.add_smali(1, "return-void").unwrap();
        assert_eq!(m.instructions()[1].to_string(), "return-void");
        assert_eq!(
            m.add_smali(5, "nop"),
            Err(PatchError::IndexOutOfBounds { index: 5, len: 2 })
        );
    }

    #[test]
    fn registers_outside_frame_are_rejected() {
        let mut m = method("return-void");
        assert_eq!(
            m.add_smali(0, "const/4 v4, 0x1"),
            Err(PatchError::InvalidRegister { register: v(4), frame: "4 locals, 2 ins".into() })
        );
        assert!(m.add_smali(0, "move p1, v3").is_ok());
        assert!(m.add_smali(0, "move p2, v3").is_err());
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn raw_register_limits_apply_to_parameters() {
        let sig = MethodSignature::from_jni("(I)V").unwrap();
        let mut m = SmaliMethod::new("run", vec![], sig, 16);
        m.push("return-void".parse().unwrap());
        // p0 is v16 here, too big for const/4
        assert!(matches!(m.add_smali(0, "const/4 p0, 0x1"), Err(PatchError::Smali(_))));
        assert!(m.add_smali(0, "const/16 p0, 0x1").is_ok());
    }

    fn hook() -> MethodRef {
        MethodRef::parse("Lapp/Hooks;->hide(Landroid/view/View;Z)V").unwrap()
    }

    fn block(b: &RegisterBinding, flag: &bool) -> Result<Vec<Instruction>, PatchError> {
        Ok(vec![
            Instruction::const4(b.free, i8::from(*flag))?,
            Instruction::invoke_static(vec![b.source, b.free], hook())?,
        ])
    }

    const SITES: &str = "
        iget-object v0, p0, LHost;->a:Landroid/view/View;
        const v1, 0x7f000001
        iget-object v2, p0, LHost;->b:Landroid/view/View;
        const v3, 0x7f000002
        return-void
    ";

    #[test]
    fn all_points_are_patched_against_original_indices() {
        let mut m = method(SITES);
        let n = patch_points(&mut m, vec![(1, false), (3, true)], true, block).unwrap();
        assert_eq!(n, 4);
        let text: Vec<String> = m.instructions().iter().map(|i| i.to_string()).collect();
        assert_eq!(text[1], "const/4 v1, 0x0");
        assert_eq!(text[2], "invoke-static {v0, v1}, Lapp/Hooks;->hide(Landroid/view/View;Z)V");
        assert_eq!(text[3], "const v1, 0x7f000001");
        assert_eq!(text[5], "const/4 v3, 0x1");
        assert_eq!(text[6], "invoke-static {v2, v3}, Lapp/Hooks;->hide(Landroid/view/View;Z)V");
        assert_eq!(text[7], "const v3, 0x7f000002");
    }

    #[test]
    fn failure_leaves_method_untouched() {
        let mut m = method(SITES);
        let before = m.clone();
        // index 4 is return-void, which has no register
        assert!(patch_points(&mut m, vec![(1, false), (4, true)], true, block).is_err());
        assert_eq!(m, before);

        assert_eq!(
            patch_points(&mut m, vec![(3, false), (1, true), (3, true)], true, block),
            Err(PatchError::DuplicatePatchPoint { index: 3 })
        );
        assert_eq!(m, before);
    }

    #[test]
    fn synthesis_errors_propagate() {
        let mut m = method(SITES);
        let r = patch_points(&mut m, vec![(1, ())], true, |b, _| {
            Ok(vec![Instruction::const_literal(b.free, 1)?, "const/4 v9, 0x0".parse()?])
        });
        assert_eq!(r, Err(PatchError::InvalidRegister { register: v(9), frame: "4 locals, 2 ins".into() }));
        let before = m.clone();
        let r = patch_points(&mut m, vec![(1, ())], false, |_, _| Ok(vec!["const/4 v9, 0x0".parse()?]));
        assert_eq!(r, Err(PatchError::InvalidRegister { register: v(9), frame: "4 locals, 2 ins".into() }));
        assert_eq!(m, before);
    }

    #[test]
    fn raw_width_check_is_optional() {
        let sig = MethodSignature::from_jni("(I)V").unwrap();
        let mut m = SmaliMethod::new("run", vec![], sig, 16);
        for line in SITES.lines().map(str::trim).filter(|l| !l.is_empty()) {
            m.push(line.parse().unwrap());
        }
        // p1 is v17 here, too big for const/4 but inside the frame
        let wide = |_: &RegisterBinding, _: &()| -> Result<Vec<Instruction>, PatchError> {
            Ok(vec!["const/4 p1, 0x0".parse()?])
        };
        assert!(matches!(patch_points(&mut m.clone(), vec![(1, ())], true, wide), Err(PatchError::Smali(_))));
        assert_eq!(patch_points(&mut m.clone(), vec![(1, ())], false, wide), Ok(1));

        let outside = |_: &RegisterBinding, _: &()| -> Result<Vec<Instruction>, PatchError> {
            Ok(vec!["const/16 p2, 0x0".parse()?])
        };
        assert_eq!(
            patch_points(&mut m, vec![(1, ())], false, outside),
            Err(PatchError::InvalidRegister { register: p(2), frame: "16 locals, 2 ins".into() })
        );
    }
}
