use std::{
    env, fs,
    fs::File,
    io,
    path::PathBuf,
    process::ExitCode,
    sync::Arc,
};

use clap::Parser as _;
use classkit_class_file::{
    constant_pool::internal_class_name, Ancestors, ClassRepository, ClassSource,
    DescendingVisitor, ImageRepository, JavaClass, Member, Node, Parser, Result, Visitor,
};
use classkit_jimage::Archive;
use memmap::Mmap;

/// Prints the structure of a class file.
#[derive(clap::Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Also check that the class serializes back to the bytes it was read from
    #[arg(long)]
    check: bool,

    /// Read the class from the runtime image of the JDK in JAVA_HOME,
    /// searching these modules in order
    #[arg(long, value_name = "MODULE,...", value_delimiter = ',')]
    image: Option<Vec<String>>,

    /// Path of a class file, or a class name with --image
    input: String,
}

fn main() -> ExitCode {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// Returns false if --check found a difference.
fn run(cli: Cli) -> Result<bool> {
    let Some(modules) = cli.image else {
        let path = PathBuf::from(cli.input);
        let bytes = fs::read(&path)?;
        let class = Parser::new(&bytes[..])
            .with_source(ClassSource::File)
            .with_file_name(path.display().to_string())
            .parse()?;
        print_class(&class);
        return Ok(!cli.check || check_round_trip(&class, &bytes)?);
    };

    let repository = ImageRepository::new(open_image()?, modules);
    let class = repository.load_class(&cli.input)?;
    print_class(&class);
    print_hierarchy(&class, &repository)?;

    if !cli.check {
        return Ok(true);
    }
    let internal_name = internal_class_name(&cli.input);
    let bytes = match repository
        .archive()
        .find_class(repository.modules(), &internal_name)
    {
        Some(resource) => resource.bytes()?,
        None => return Ok(false),
    };
    check_round_trip(&class, bytes)
}

fn open_image() -> Result<Archive<Mmap>> {
    let path = env::var("JAVA_HOME")
        .map(|s| PathBuf::from(s).join("lib/modules"))
        .map_err(|_| io::Error::new(io::ErrorKind::NotFound, "JAVA_HOME is not set"))?;
    let file = File::open(path)?;
    let mmap = unsafe { Mmap::map(&file)? };

    Ok(Archive::parse(mmap)?)
}

fn print_class(class: &JavaClass) {
    let mut visitor = DescendingVisitor::new(Printer);
    visitor.visit(class);
}

fn print_hierarchy(class: &Arc<JavaClass>, repository: &dyn ClassRepository) -> Result<()> {
    let super_classes = class.super_classes(repository)?;
    let all_interfaces = class.all_interfaces(repository)?;

    println!();
    println!(
        "Super classes:  {}",
        super_classes
            .iter()
            .map(|c| c.class_name())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!(
        "All interfaces: {}",
        all_interfaces
            .iter()
            .map(|c| c.class_name())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(())
}

fn check_round_trip(class: &JavaClass, bytes: &[u8]) -> Result<bool> {
    let written = class.to_bytes()?;
    if written == bytes {
        println!("Round trip OK ({} bytes)", bytes.len());
        return Ok(true);
    }

    let offset = written
        .iter()
        .zip(bytes)
        .position(|(a, b)| a != b)
        .unwrap_or_else(|| written.len().min(bytes.len()));
    println!(
        "Round trip differs at byte {} (read {} bytes, wrote {})",
        offset,
        bytes.len(),
        written.len()
    );
    Ok(false)
}

/// Prints one line per node, indented by its depth in the tree.
struct Printer;
impl Visitor for Printer {
    fn visit_node(&mut self, node: Node<'_>, ancestors: &Ancestors<'_>) {
        let indent = "  ".repeat(ancestors.depth().saturating_sub(1));
        println!("{}{}", indent, describe(node, ancestors));
    }
}

fn describe(node: Node<'_>, ancestors: &Ancestors<'_>) -> String {
    match node {
        Node::JavaClass(class) => format!(
            "{} {} extends {} (version {}.{}, source {})",
            if class.is_interface() { "interface" } else { "class" },
            class.class_name(),
            class.superclass_name(),
            class.major_version(),
            class.minor_version(),
            class.source_file_name()
        ),
        Node::Field(field) => format!(
            "field {} {} {:?}",
            field.name().unwrap_or("?"),
            field.signature().unwrap_or("?"),
            field.access_flags()
        ),
        Node::Method(method) => format!(
            "method {}{} {:?}",
            method.name().unwrap_or("?"),
            method.signature().unwrap_or("?"),
            method.access_flags()
        ),
        Node::Attribute(attribute) => format!(
            "{} ({} bytes)",
            attribute.name().unwrap_or("?"),
            attribute.length()
        ),
        Node::CodeException(entry) => format!(
            "handler [{}, {}) -> {} catch #{}",
            entry.start_pc, entry.end_pc, entry.handler_pc, entry.catch_type
        ),
        Node::LineNumber(line_number) => format!(
            "line {} at pc {}",
            line_number.line_number, line_number.start_pc
        ),
        Node::LocalVariable(local_variable) => {
            let name = match ancestors.predecessor(0) {
                Some(Node::Attribute(table)) => local_variable
                    .name(table.constant_pool())
                    .unwrap_or("?")
                    .to_owned(),
                _ => format!("#{}", local_variable.name_index),
            };
            format!(
                "slot {} {} pc [{}, {})",
                local_variable.index,
                name,
                local_variable.start_pc,
                local_variable.start_pc as u32 + local_variable.length as u32
            )
        }
        Node::InnerClass(inner_class) => format!(
            "inner class #{} in #{} {:?}",
            inner_class.inner_class_info_index,
            inner_class.outer_class_info_index,
            inner_class.inner_access_flags
        ),
        Node::ConstantPool(constant_pool) => {
            format!("constant pool ({} slots)", constant_pool.count() - 1)
        }
        Node::Constant(index, cp_info) => {
            let value = match ancestors.predecessor(0) {
                Some(Node::ConstantPool(constant_pool)) => constant_pool
                    .constant_to_string(index)
                    .unwrap_or_else(|e| e.to_string()),
                _ => String::new(),
            };
            let tag = cp_info.tag().map(|tag| tag.name()).unwrap_or("Unusable");
            format!("#{} = {} {}", index, tag, value)
        }
    }
}
