mod common;

use std::{
    any::Any,
    io::{Cursor, Read, Write},
    sync::Arc,
};

use classkit_class_file::{
    attributes::{AttributeInfo, AttributeReader, AttributeTag, CustomAttribute, LineNumber},
    constant_pool::CpInfo,
    AccessFlags, ClassFileError, ClassSource, ConstantPool, JavaClass, Member, Parser,
    ParserContext, Result,
};
use common::{my_class, ClassBuilder};

fn with_java_class(f: impl FnOnce(JavaClass)) {
    common::init_logger();
    f(JavaClass::parse(&my_class().build()[..]).unwrap());
}

fn assert_round_trip(bytes: &[u8]) -> JavaClass {
    let class = JavaClass::parse(bytes).unwrap();
    assert_eq!(bytes, class.to_bytes().unwrap().as_slice());
    class
}

#[test]
fn test_super_class() {
    with_java_class(|class| assert_eq!("java.lang.Object", class.superclass_name()));
}

#[test]
fn test_class_name() {
    with_java_class(|class| {
        assert_eq!("my.MyClass", class.class_name());
        assert_eq!("my", class.package_name());
        assert_eq!("MyClass.java", class.source_file_name());
    });
}

#[test]
fn test_version() {
    with_java_class(|class| {
        assert_eq!(52, class.major_version());
        assert_eq!(0, class.minor_version());
    });
}

#[test]
fn test_field_name() {
    with_java_class(|class| assert_eq!("myField", class.fields()[0].name().unwrap()));
}

#[test]
fn test_int_field_type() {
    with_java_class(|class| assert_eq!("I", class.fields()[0].signature().unwrap()));
}

#[test]
fn test_field_access_flags() {
    with_java_class(|class| {
        assert_eq!(
            AccessFlags::FINAL | AccessFlags::PRIVATE,
            class.fields()[0].access_flags()
        )
    });
}

#[test]
fn test_field_constant_value() {
    with_java_class(|class| {
        let field = class.field("myField").unwrap();
        let constant_value = field.constant_value().unwrap();
        assert_eq!(
            "7",
            class
                .constant_pool()
                .constant_to_string(constant_value.constantvalue_index)
                .unwrap()
        );
    });
}

#[test]
fn test_constructor_name() {
    with_java_class(|class| assert_eq!("<init>", class.methods()[0].name().unwrap()));
}

#[test]
fn test_constructor_descriptor() {
    with_java_class(|class| assert_eq!("()V", class.methods()[0].signature().unwrap()));
}

#[test]
fn test_method_name() {
    with_java_class(|class| assert_eq!("add", class.methods()[1].name().unwrap()));
}

#[test]
fn test_method_descriptor() {
    with_java_class(|class| assert_eq!("(I)F", class.methods()[1].signature().unwrap()));
}

#[test]
fn test_method_access_flags() {
    with_java_class(|class| {
        let method = class.method("add", "(I)F").unwrap();
        assert_eq!(AccessFlags::PUBLIC, method.access_flags());
        assert!(method.is_public());
        assert!(!method.is_static());
        assert!(!method.is_abstract());
    });
}

#[test]
fn test_method_lookup_by_descriptor() {
    with_java_class(|class| {
        assert!(class.method("add", "(I)F").is_some());
        assert!(class.method("add", "(J)F").is_none());
        assert!(class.field("missing").is_none());
    });
}

#[test]
fn test_code() {
    with_java_class(|class| {
        let method = class.method("add", "(I)F").unwrap();
        let code = method.code().unwrap();
        assert_eq!(2, code.max_stack);
        assert_eq!(3, code.max_locals);
        assert_eq!(12, code.code.len());
        assert_eq!(2, code.exception_table.len());
        assert_eq!(
            Some("java/io/IOException"),
            code.exception_table[0]
                .catch_type_name(class.constant_pool())
                .unwrap()
        );
        assert_eq!(
            None,
            code.exception_table[1]
                .catch_type_name(class.constant_pool())
                .unwrap()
        );
    });
}

#[test]
fn test_declared_exceptions() {
    with_java_class(|class| {
        let method = class.method("add", "(I)F").unwrap();
        let exceptions = method.exception_table().unwrap();
        assert_eq!(
            vec!["java/io/IOException"],
            exceptions.exception_names(class.constant_pool()).unwrap()
        );
        assert!(class.methods()[0].exception_table().is_none());
    });
}

#[test]
fn test_line_numbers() {
    with_java_class(|class| {
        let table = class.method("add", "(I)F").unwrap().line_number_table().unwrap();
        assert_eq!(Some(1), table.source_line(0));
        assert_eq!(Some(2), table.source_line(7));
        assert_eq!(Some(3), table.source_line(11));
    });
}

#[test]
fn test_local_variables() {
    with_java_class(|class| {
        let table = class
            .method("add", "(I)F")
            .unwrap()
            .local_variable_table()
            .unwrap();
        let variable = table.local_variable_at(1, 4).unwrap();
        assert_eq!("i", variable.name(class.constant_pool()).unwrap());
        assert_eq!("I", variable.signature(class.constant_pool()).unwrap());
        assert!(table.local_variable_at(1, 12).is_none());
    });
}

#[test]
fn test_round_trip() {
    with_java_class(|class| {
        assert_eq!(my_class().build(), class.to_bytes().unwrap());
    });
}

#[test]
fn test_round_trip_without_members() {
    let class = assert_round_trip(&ClassBuilder::new("Empty", Some("java/lang/Object")).build());
    assert!(class.fields().is_empty());
    assert!(class.methods().is_empty());
    assert!(class.attributes().is_empty());
    assert_eq!("", class.package_name());
    assert_eq!("<Unknown>", class.source_file_name());
}

#[test]
fn test_round_trip_object() {
    let class = assert_round_trip(&ClassBuilder::new("java/lang/Object", None).build());
    assert_eq!(0, class.superclass_name_index());
    assert_eq!("java.lang.Object", class.superclass_name());
}

#[test]
fn test_round_trip_wide_constants() {
    let mut builder = ClassBuilder::new("Constants", Some("java/lang/Object"));
    let long = builder.long(-1);
    let double = builder.double(0.5);
    let string = builder.string("h\u{e9}llo");
    let constant_value = builder.constant_value(long);
    builder.field(
        common::ACC_STATIC | common::ACC_FINAL,
        "L",
        "J",
        vec![constant_value],
    );
    let bytes = builder.build();

    let class = assert_round_trip(&bytes);
    let pool = class.constant_pool();
    assert_eq!("-1L", pool.constant_to_string(long).unwrap());
    assert_eq!("0.5d", pool.constant_to_string(double).unwrap());
    assert_eq!("\"h\u{e9}llo\"", pool.constant_to_string(string).unwrap());
    assert!(pool.get(long + 1).is_err());
}

#[test]
fn test_round_trip_non_canonical_strings() {
    let mut builder = ClassBuilder::new("Strings", Some("java/lang/Object"));
    // "\uD800" as javac writes it, an unpaired high surrogate
    let surrogate = builder.raw_utf8(&[0xed, 0xa0, 0x80]);
    let string = builder.string_at(surrogate);
    // "A" in an overlong two-byte form
    let overlong = builder.raw_utf8(&[0xc1, 0x81]);
    let bytes = builder.build();

    let class = assert_round_trip(&bytes);
    let pool = class.constant_pool();
    assert_eq!("\u{FFFD}", pool.get_utf8(surrogate).unwrap());
    assert_eq!(
        format!("{:?}", "\u{FFFD}"),
        pool.constant_to_string(string).unwrap()
    );
    assert_eq!("A", pool.get_utf8(overlong).unwrap());
    assert_eq!(bytes, class.copy().to_bytes().unwrap());

    // New constants are written canonically next to the kept bytes
    let mut copy = class.copy();
    let renamed = copy.update_constant_pool(|pool| pool.add_class("Renamed"));
    copy.set_class_name_index(renamed);
    copy.refresh_derived_names().unwrap();

    let reparsed = JavaClass::parse(&copy.to_bytes().unwrap()[..]).unwrap();
    assert_eq!("Renamed", reparsed.class_name());
    assert!(matches!(
        reparsed.constant_pool().get(overlong).unwrap(),
        CpInfo::Utf8(utf8) if utf8.as_bytes() == [0xc1, 0x81]
    ));
}

#[test]
fn test_round_trip_unknown_attribute() {
    let mut builder = ClassBuilder::new("Odd", Some("java/lang/Object"));
    let unknown = builder.attribute("com.example.Opaque", &[1, 2, 3, 4, 5]);
    let empty = builder.attribute("com.example.Empty", &[]);
    builder.class_attribute(unknown).class_attribute(empty);

    let class = assert_round_trip(&builder.build());
    assert_eq!(AttributeTag::Unknown, class.attributes()[0].tag());
    assert_eq!(5, class.attributes()[0].length());
    assert_eq!(
        "com.example.Opaque",
        class.attributes()[0].name().unwrap()
    );
    assert!(matches!(
        class.attributes()[0].info(),
        AttributeInfo::Unknown(unknown) if unknown.bytes == [1, 2, 3, 4, 5]
    ));
    assert_eq!(0, class.attributes()[1].length());
}

#[test]
fn test_parse_leaves_the_rest_of_the_stream() {
    let first = my_class().build();
    let second = ClassBuilder::new("Second", Some("java/lang/Object")).build();
    let mut stream = Cursor::new([&first[..], &second[..], &b"tail"[..]].concat());

    assert_eq!("my.MyClass", JavaClass::parse(&mut stream).unwrap().class_name());
    assert_eq!(first.len() as u64, stream.position());
    assert_eq!("Second", JavaClass::parse(&mut stream).unwrap().class_name());

    let mut rest = Vec::new();
    stream.read_to_end(&mut rest).unwrap();
    assert_eq!(b"tail".to_vec(), rest);
}

#[test]
fn test_parser_source_and_file_name() {
    let bytes = my_class().build();
    let class = Parser::new(&bytes[..])
        .with_source(ClassSource::File)
        .with_file_name("my/MyClass.class")
        .parse()
        .unwrap();
    assert_eq!(ClassSource::File, class.source());
    assert_eq!(Some("my/MyClass.class"), class.file_name());

    let class = JavaClass::parse(&bytes[..]).unwrap();
    assert_eq!(ClassSource::Heap, class.source());
    assert_eq!(None, class.file_name());
}

#[test]
fn test_invalid_magic_identifier() {
    let mut bytes = my_class().build();
    bytes[3] = 0xbf;
    let error = JavaClass::parse(&bytes[..]).unwrap_err();
    assert!(matches!(error, ClassFileError::InvalidMagicIdentifier(0xCAFEBABF)));
    assert!(error.is_format_error());
}

#[test]
fn test_truncated_stream() {
    let bytes = my_class().build();
    for length in 0..bytes.len() {
        let error = JavaClass::parse(&bytes[..length]).unwrap_err();
        assert!(error.is_format_error(), "{} bytes: {}", length, error);
    }
}

#[test]
fn test_attribute_overrunning_its_length() {
    let mut builder = ClassBuilder::new("Broken", Some("java/lang/Object"));
    // A SourceFile body is 2 bytes
    let source_file = builder.attribute("SourceFile", &[0, 1, 0]);
    builder.class_attribute(source_file);

    let error = JavaClass::parse(&builder.build()[..]).unwrap_err();
    assert!(matches!(
        error,
        ClassFileError::AttributeLengthMismatch {
            expected: 3,
            actual: 2,
            ..
        }
    ));
}

#[derive(Debug, Clone)]
struct Marker {
    reader: &'static str,
    value: u16,
}
impl CustomAttribute for Marker {
    fn name(&self) -> &str {
        "Marker"
    }

    fn body_length(&self) -> u32 {
        2
    }

    fn write_body(&self, writer: &mut dyn Write) -> std::io::Result<()> {
        writer.write_all(&self.value.to_be_bytes())
    }

    fn box_clone(&self) -> Box<dyn CustomAttribute> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct MarkerReader {
    id: &'static str,
    consumed: usize,
}
impl AttributeReader for MarkerReader {
    fn read(
        &self,
        _name_index: u16,
        _length: u32,
        input: &mut Cursor<&[u8]>,
        _constant_pool: &ConstantPool,
    ) -> Result<Box<dyn CustomAttribute>> {
        let mut bytes = vec![0; self.consumed];
        input.read_exact(&mut bytes)?;
        let value = bytes.iter().fold(0u16, |value, &b| value << 8 | b as u16);
        Ok(Box::new(Marker {
            reader: self.id,
            value,
        }))
    }
}

fn marked_class() -> Vec<u8> {
    let mut builder = ClassBuilder::new("Marked", Some("java/lang/Object"));
    let marker = builder.attribute("Marker", &[0x12, 0x34]);
    builder.class_attribute(marker);
    builder.build()
}

fn marker(class: &JavaClass) -> &Marker {
    match class.attributes()[0].info() {
        AttributeInfo::Custom(custom) => custom.as_any().downcast_ref::<Marker>().unwrap(),
        info => panic!("expected a custom attribute, got {:?}", info),
    }
}

#[test]
fn test_custom_attribute_reader() {
    let bytes = marked_class();
    let mut context = ParserContext::new();
    context.register_reader(
        "Marker",
        MarkerReader {
            id: "first",
            consumed: 2,
        },
    );

    let class = JavaClass::parse_with(&bytes[..], &context).unwrap();
    assert_eq!(0x1234, marker(&class).value);
    assert_eq!(bytes, class.to_bytes().unwrap());

    // Contexts are per parse
    let class = JavaClass::parse(&bytes[..]).unwrap();
    assert!(matches!(class.attributes()[0].info(), AttributeInfo::Unknown(_)));
}

#[test]
fn test_last_registered_reader_wins() {
    let mut context = ParserContext::new();
    let first = context.register_reader(
        "Marker",
        MarkerReader {
            id: "first",
            consumed: 2,
        },
    );
    let second = context.register_reader(
        "Marker",
        MarkerReader {
            id: "second",
            consumed: 2,
        },
    );
    assert!(first.is_none());
    assert!(second.is_some());

    let class = JavaClass::parse_with(&marked_class()[..], &context).unwrap();
    assert_eq!("second", marker(&class).reader);
}

#[test]
fn test_custom_reader_consuming_too_little() {
    let mut context = ParserContext::new();
    context.register_reader(
        "Marker",
        MarkerReader {
            id: "short",
            consumed: 1,
        },
    );

    let error = JavaClass::parse_with(&marked_class()[..], &context).unwrap_err();
    assert!(matches!(
        error,
        ClassFileError::AttributeLengthMismatch { expected: 2, actual: 1, .. }
    ));
}

#[test]
fn test_shallow_clone_shares_the_constant_pool() {
    with_java_class(|class| {
        let mut clone = class.clone();
        assert!(Arc::ptr_eq(class.constant_pool(), clone.constant_pool()));
        assert!(Arc::ptr_eq(
            class.constant_pool(),
            clone.methods()[1].constant_pool()
        ));

        // Members are not shared
        let bytes = class.to_bytes().unwrap();
        clone.methods_mut()[1].update_code(|code| code.max_stack = 9);
        clone.fields_mut().clear();
        assert_eq!(bytes, class.to_bytes().unwrap());
        assert_eq!(1, class.fields().len());

        // Nor is a changed pool
        clone.update_constant_pool(|pool| pool.add_utf8("Added"));
        assert!(!Arc::ptr_eq(class.constant_pool(), clone.constant_pool()));
        assert_eq!(None, class.constant_pool().lookup_utf8("Added"));
    });
}

#[test]
fn test_copy_is_independent() {
    with_java_class(|mut class| {
        let bytes = class.to_bytes().unwrap();
        let line_numbers = class.methods()[1].line_number_table().unwrap().clone();
        let mut copy = class.copy();

        assert!(!Arc::ptr_eq(class.constant_pool(), copy.constant_pool()));
        assert!(Arc::ptr_eq(copy.constant_pool(), copy.fields()[0].constant_pool()));
        let code = copy.methods()[1].code().unwrap();
        assert!(Arc::ptr_eq(copy.constant_pool(), code.attributes[0].constant_pool()));
        assert!(Arc::ptr_eq(copy.constant_pool(), copy.attributes()[0].constant_pool()));

        copy.methods_mut()[1].update_code(|code| {
            code.code[0] = 0x00;
            code.exception_table[0].handler_pc = 9;
            code.exception_table.pop();
            code.attributes[0].update(|info| {
                if let AttributeInfo::LineNumberTable(table) = info {
                    table.line_numbers[0].line_number = 99;
                    table.line_numbers.push(LineNumber {
                        start_pc: 11,
                        line_number: 4,
                    });
                }
            });
        });
        copy.update_constant_pool(|pool| pool.add_utf8("Added"));
        copy.set_access_flags(AccessFlags::PUBLIC | AccessFlags::FINAL);
        assert_eq!(bytes, class.to_bytes().unwrap());
        assert_ne!(bytes, copy.to_bytes().unwrap());

        // Nested attributes of Code belong to the copy alone
        assert_eq!(&line_numbers, class.methods()[1].line_number_table().unwrap());
        let copied_lines = copy.methods()[1].line_number_table().unwrap();
        assert_eq!(4, copied_lines.line_numbers.len());
        assert_eq!(Some(99), copied_lines.source_line(0));
        assert_eq!(Some(1), class.methods()[1].line_number_table().unwrap().source_line(0));

        // The other way around
        let copy_bytes = copy.to_bytes().unwrap();
        class.methods_mut()[0].update_code(|code| code.max_stack = 7);
        class.fields_mut().clear();
        assert_eq!(copy_bytes, copy.to_bytes().unwrap());
    });
}

#[test]
fn test_length_follows_the_contents() {
    with_java_class(|mut class| {
        let length = |class: &JavaClass| {
            class.methods()[1]
                .attribute(AttributeTag::Code)
                .unwrap()
                .length()
        };
        let before = length(&class);

        class.methods_mut()[1].update_code(|code| {
            code.code.extend_from_slice(&[0x00, 0x00]);
            code.exception_table.pop();
            code.attributes.pop();
        });
        let code = class.methods()[1].code().unwrap();
        assert_eq!(code.body_length(), length(&class));
        // 2 more opcodes, one handler (8) and the local variable table (6 + 2 + 2 * 10) less
        assert_eq!(before + 2 - 8 - 28, length(&class));

        let reparsed = JavaClass::parse(&class.to_bytes().unwrap()[..]).unwrap();
        assert_eq!(length(&class), length(&reparsed));
        assert!(reparsed.methods()[1].local_variable_table().is_none());
    });
}

#[test]
fn test_derived_names_are_cached() {
    with_java_class(|mut class| {
        let bytes = class.to_bytes().unwrap();
        let object_index = class.superclass_name_index();

        class.set_class_name_index(object_index);
        assert_eq!("my.MyClass", class.class_name());
        class.refresh_derived_names().unwrap();
        assert_eq!("java.lang.Object", class.class_name());
        assert_eq!("java.lang", class.package_name());

        let mut class = JavaClass::parse(&bytes[..]).unwrap();
        class.set_class_name("my.Renamed");
        assert_eq!("my.Renamed", class.class_name());
        assert_eq!(bytes, class.to_bytes().unwrap());
    });
}

#[test]
fn test_dump_to_file() {
    with_java_class(|class| {
        let path = std::env::temp_dir().join(format!("classkit-dump-{}.class", std::process::id()));
        class.dump_to_file(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(class.to_bytes().unwrap(), bytes);
    });
}
