mod engine;
mod trending_searches;

use crate::types::{MethodSignature, Modifier, SmaliMethod};

/// Builds a method from smali lines; `:name` lines bind labels.
pub(crate) fn method_from(signature: &str, modifiers: Vec<Modifier>, locals: u16, body: &str) -> SmaliMethod {
    let sig = MethodSignature::from_jni(signature).unwrap();
    let mut m = SmaliMethod::new("run", modifiers, sig, locals);
    for line in body.lines().map(str::trim).filter(|l| !l.is_empty() && !l.starts_with('#')) {
        match crate::smali_ops::parse_label(line) {
            Ok(("", label)) => m.push_label(label),
            _ => m.push(line.parse().unwrap()),
        }
    }
    m
}

#[cfg(test)]
mod tests {
    use crate::types::{MethodSignature, ObjectIdentifier, SmaliClass, TypeSignature};
    use std::path::Path;

    #[test]
    fn object_identifier_to_jni() {
        let o = ObjectIdentifier::from_java_type("com.google.android.apps.youtube.app.ui.SearchBar");
        assert_eq!(o.as_java_type(), "com.google.android.apps.youtube.app.ui.SearchBar");
        assert_eq!(o.as_jni_type(), "Lcom/google/android/apps/youtube/app/ui/SearchBar;");
    }

    #[test]
    fn signatures() {
        let t = TypeSignature::Bool;
        assert_eq!(t.to_jni(), "Z");
        let m = MethodSignature::from_jni("(Landroid/widget/ImageView;Z)V").unwrap();
        assert_eq!(m.result, TypeSignature::Void);
    }

    #[test]
    fn parse_write() {
        let dex = SmaliClass::read_from_file(Path::new("tests/SearchEntryBinder.smali")).unwrap();
        let smali = dex.to_smali();

        // Attempt to parse the output
        let reparsed = SmaliClass::from_smali(&smali).unwrap();
        assert_eq!(reparsed.methods, dex.methods);
        assert_eq!(reparsed.directives, dex.directives);
    }
}
