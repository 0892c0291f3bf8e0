//! The subset of Jasmin directives and JVM mnemonics the
//! emitter uses, plus the mapping from source types to the
//! platform's descriptor encoding.

use crate::compiler::ast::Ty;

// Directives
pub const CLASS: &str = ".class";
pub const SUPER: &str = ".super";
pub const STATIC_FIELD: &str = ".field static";
pub const LIMIT: &str = ".limit";
pub const METHOD_START: &str = ".method";
pub const METHOD_END: &str = ".end method";
pub const VAR: &str = ".var";

// Arithmetic
pub const IADD: &str = "iadd";
pub const FADD: &str = "fadd";
pub const ISUB: &str = "isub";
pub const FSUB: &str = "fsub";
pub const IMUL: &str = "imul";
pub const FMUL: &str = "fmul";
pub const IDIV: &str = "idiv";
pub const FDIV: &str = "fdiv";
pub const INEG: &str = "ineg";
pub const FNEG: &str = "fneg";
pub const FCMPG: &str = "fcmpg";

// Array access
pub const IALOAD: &str = "iaload";
pub const FALOAD: &str = "faload";
pub const BALOAD: &str = "baload";
pub const IASTORE: &str = "iastore";
pub const FASTORE: &str = "fastore";
pub const BASTORE: &str = "bastore";
pub const NEWARRAY: &str = "newarray";

// Fields and locals
pub const GETSTATIC: &str = "getstatic";
pub const PUTSTATIC: &str = "putstatic";
pub const ILOAD: &str = "iload";
pub const FLOAD: &str = "fload";
pub const ALOAD: &str = "aload";
pub const ISTORE: &str = "istore";
pub const FSTORE: &str = "fstore";
pub const ASTORE: &str = "astore";

// Constants
pub const ICONST: &str = "iconst";
pub const ICONST_M1: &str = "iconst_m1";
pub const FCONST_0: &str = "fconst_0";
pub const FCONST_1: &str = "fconst_1";
pub const FCONST_2: &str = "fconst_2";
pub const BIPUSH: &str = "bipush";
pub const SIPUSH: &str = "sipush";
pub const LDC: &str = "ldc";

// Calls and returns
pub const INVOKESTATIC: &str = "invokestatic";
pub const INVOKESPECIAL: &str = "invokespecial";
pub const INVOKEVIRTUAL: &str = "invokevirtual";
pub const IRETURN: &str = "ireturn";
pub const FRETURN: &str = "freturn";
pub const RETURN: &str = "return";

// Control transfer
pub const GOTO: &str = "goto";
pub const IFEQ: &str = "ifeq";
pub const IFNE: &str = "ifne";
pub const IFLT: &str = "iflt";
pub const IFLE: &str = "ifle";
pub const IFGT: &str = "ifgt";
pub const IFGE: &str = "ifge";
pub const IF_ICMPEQ: &str = "if_icmpeq";
pub const IF_ICMPNE: &str = "if_icmpne";
pub const IF_ICMPLT: &str = "if_icmplt";
pub const IF_ICMPLE: &str = "if_icmple";
pub const IF_ICMPGT: &str = "if_icmpgt";
pub const IF_ICMPGE: &str = "if_icmpge";

// Conversion, objects, stack management
pub const I2F: &str = "i2f";
pub const NEW: &str = "new";
pub const DUP: &str = "dup";
pub const POP: &str = "pop";
pub const NOP: &str = "nop";

/// The platform descriptor for a source type: `I`, `F`, `Z`,
/// `V`, `[I` and friends, `Ljava/lang/String;` for string
/// literals.
pub fn descriptor(ty: &Ty) -> String {
    match ty {
        Ty::Bool => "Z".to_string(),
        Ty::Int => "I".to_string(),
        Ty::Float => "F".to_string(),
        Ty::Void => "V".to_string(),
        Ty::Str => "Ljava/lang/String;".to_string(),
        Ty::Array(elem, _) => format!("[{}", descriptor(elem)),
        Ty::Error => panic!("error type reached code generation"),
    }
}

/// The element-type name `newarray` takes.
pub fn newarray_name(ty: &Ty) -> &'static str {
    match ty {
        Ty::Int => "int",
        Ty::Float => "float",
        Ty::Bool => "boolean",
        other => panic!("newarray of non-scalar element type {}", other),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn descriptors() {
        assert_eq!(descriptor(&Ty::Int), "I");
        assert_eq!(descriptor(&Ty::Void), "V");
        assert_eq!(descriptor(&Ty::Array(Box::new(Ty::Bool), Some(4))), "[Z");
        assert_eq!(descriptor(&Ty::Str), "Ljava/lang/String;");
    }
}
