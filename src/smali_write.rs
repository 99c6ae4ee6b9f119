use crate::types::*;

fn write_modifiers(mods: &[Modifier]) -> String
{
    let mut out = String::new();
    for m in mods
    {
        out.push_str(m.to_str());
        out.push(' ');
    }
    out
}

// Raw blocks are stored trimmed; nested lines get one extra level of indentation.
fn write_block(out: &mut String, block: &str, indent: &str)
{
    let mut lines = block.lines();
    if let Some(first) = lines.next()
    {
        out.push_str(indent);
        out.push_str(first);
        out.push('\n');
    }
    let mut rest: Vec<&str> = lines.collect();
    let last = rest.pop();
    for l in rest
    {
        out.push_str(indent);
        out.push_str("    ");
        out.push_str(l);
        out.push('\n');
    }
    if let Some(l) = last
    {
        out.push_str(indent);
        out.push_str(l);
        out.push('\n');
    }
}

// Labels first, then debug directives, as baksmali orders them.
fn write_bound(out: &mut String, method: &SmaliMethod, index: usize)
{
    for l in method.labels_at(index)
    {
        out.push_str(&format!("    {}\n", l));
    }
    for d in method.debug_at(index)
    {
        out.push_str(&format!("    {}\n", d));
    }
}

pub(crate) fn write_method(method: &SmaliMethod) -> String
{
    let mut out = format!(".method {}{}{}\n", write_modifiers(&method.modifiers), method.name, method.signature.to_jni());
    if !method.is_empty() || method.locals > 0
    {
        out.push_str(&format!("    .locals {}\n", method.locals));
    }

    for d in &method.directives
    {
        write_block(&mut out, d, "    ");
    }

    for (i, insn) in method.instructions().iter().enumerate()
    {
        out.push('\n');
        write_bound(&mut out, method, i);
        out.push_str(&format!("    {}\n", insn));
    }

    if method.labels_at(method.len()).next().is_some() || method.debug_at(method.len()).next().is_some()
    {
        out.push('\n');
        write_bound(&mut out, method, method.len());
    }

    if !method.catches.is_empty()
    {
        out.push('\n');
        for c in &method.catches
        {
            out.push_str(&format!("    {}\n", c));
        }
    }

    for p in &method.payloads
    {
        out.push('\n');
        for l in &p.labels
        {
            out.push_str(&format!("    {}\n", l));
        }
        write_block(&mut out, &p.lines.join("\n"), "    ");
    }

    out.push_str(".end method\n");
    out
}

pub(crate) fn write_class(dex: &SmaliClass) -> String
{
    let mut out = format!(".class {}{}\n", write_modifiers(&dex.modifiers), dex.name.as_jni_type());
    out.push_str(&format!(".super {}\n", dex.super_class.as_jni_type()));
    if let Some(s) = &dex.source
    {
        out.push_str(&format!(".source \"{}\"\n", s));
    }

    if !dex.directives.is_empty()
    {
        out.push('\n');
        for d in &dex.directives
        {
            write_block(&mut out, d, "");
            out.push('\n');
        }
    }

    if !dex.methods.is_empty()
    {
        out.push_str("\n# methods\n");
        for m in &dex.methods
        {
            out.push_str(&write_method(m));
            out.push('\n');
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smali_ops::strip_comment;
    use crate::smali_parse::parse_class;
    use std::fs;

    const CLASS: &str = r#".class public LFoo;
.super Ljava/lang/Object;
.source "Foo.java"

.field private final bar:I
    .annotation build Landroidx/annotation/Keep;
    .end annotation
.end field

.method public run(I)V
    .locals 1
    if-eqz p1, :cond_0
    const/4 v0, 0x1
    :cond_0
    return-void
.end method
"#;

    #[test]
    fn writes_labels_before_their_instruction() {
        let c = parse_class(CLASS).unwrap();
        let out = write_method(&c.methods[0]);
        assert!(out.contains("    :cond_0\n    return-void\n"), "{out}");
        assert!(out.starts_with(".method public run(I)V\n    .locals 1\n"));
    }

    #[test]
    fn written_class_parses_back_to_the_same_model() {
        let c = parse_class(CLASS).unwrap();
        let out = write_class(&c);
        assert!(out.contains("    .annotation build Landroidx/annotation/Keep;\n    .end annotation\n.end field"), "{out}");
        assert_eq!(parse_class(&out).unwrap(), c);
    }

    const DEBUG_INFO: &str = r#".class public LFoo;
.super Ljava/lang/Object;
.source "Foo.java"

.field private final bar:I

# methods
.method public run(I)V
    .locals 2
    .param p1, "flag"    # Z

    .prologue
    .line 7
    if-eqz p1, :cond_0

    .line 8
    const/4 v0, 0x1

    .local v0, "shown":Z
    invoke-static {v0}, LFoo;->log(Z)V

    :cond_0
    .end local v0    # "shown":Z
    .line 10
    return-void
.end method
"#;

    fn normalized(smali: &str) -> Vec<String> {
        smali
            .lines()
            .map(|l| strip_comment(l).trim())
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect()
    }

    #[test]
    fn saved_class_matches_source() {
        let c = parse_class(DEBUG_INFO).unwrap();
        assert_eq!(c.methods[0].debug_directives().len(), 6);

        let path = std::env::temp_dir().join("smali_patcher_saved_class.smali");
        c.write_to_file(&path).unwrap();
        let saved = fs::read_to_string(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(normalized(&saved), normalized(DEBUG_INFO));
    }

    #[test]
    fn debug_directives_stay_with_their_instruction() {
        let mut c = parse_class(DEBUG_INFO).unwrap();
        c.methods[0].add_smali(1, "const/4 v1, 0x0").unwrap();
        let out = write_method(&c.methods[0]);
        assert!(out.contains("    const/4 v1, 0x0\n\n    .line 8\n    const/4 v0, 0x1\n"), "{out}");
        assert!(out.contains("    :cond_0\n    .end local v0\n    .line 10\n    return-void\n"), "{out}");
    }
}
