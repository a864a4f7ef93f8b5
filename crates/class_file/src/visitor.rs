use crate::{
    attributes::{
        Attribute, AttributeInfo, Code, CodeException, ConstantValue, CustomAttribute, Deprecated,
        EnclosingMethod, ExceptionTable, InnerClass, InnerClasses, LineNumber, LineNumberTable,
        LocalVariable, LocalVariableTable, NestHost, NestMembers, Signature, SourceFile, Synthetic,
        Unknown,
    },
    constant_pool::{ConstantPool, CpInfo},
    Field, JavaClass, Member, Method,
};

/// Any node of a class file tree.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    JavaClass(&'a JavaClass),
    Field(&'a Field),
    Method(&'a Method),
    Attribute(&'a Attribute),
    CodeException(&'a CodeException),
    LineNumber(&'a LineNumber),
    LocalVariable(&'a LocalVariable),
    InnerClass(&'a InnerClass),
    ConstantPool(&'a ConstantPool),
    /// A usable constant pool entry and its index.
    Constant(u16, &'a CpInfo),
}
impl<'a> Node<'a> {
    pub fn kind(&self) -> &'static str {
        match self {
            Node::JavaClass(_) => "JavaClass",
            Node::Field(_) => "Field",
            Node::Method(_) => "Method",
            Node::Attribute(_) => "Attribute",
            Node::CodeException(_) => "CodeException",
            Node::LineNumber(_) => "LineNumber",
            Node::LocalVariable(_) => "LocalVariable",
            Node::InnerClass(_) => "InnerClass",
            Node::ConstantPool(_) => "ConstantPool",
            Node::Constant(..) => "Constant",
        }
    }

    /// Direct children in traversal order.
    ///
    /// A class yields its fields, then its methods, then its attributes and
    /// finally its constant pool. A `Code` attribute yields its exception
    /// handlers before its nested attributes. The constant pool yields its
    /// usable entries by ascending index.
    pub fn children(&self) -> Vec<Node<'a>> {
        match *self {
            Node::JavaClass(class) => class
                .fields()
                .iter()
                .map(Node::Field)
                .chain(class.methods().iter().map(Node::Method))
                .chain(class.attributes().iter().map(Node::Attribute))
                .chain(std::iter::once(Node::ConstantPool(
                    class.constant_pool().as_ref(),
                )))
                .collect(),
            Node::Field(field) => field.attributes().iter().map(Node::Attribute).collect(),
            Node::Method(method) => method.attributes().iter().map(Node::Attribute).collect(),
            Node::Attribute(attribute) => match attribute.info() {
                AttributeInfo::Code(code) => code
                    .exception_table
                    .iter()
                    .map(Node::CodeException)
                    .chain(code.attributes.iter().map(Node::Attribute))
                    .collect(),
                AttributeInfo::LineNumberTable(table) => {
                    table.line_numbers.iter().map(Node::LineNumber).collect()
                }
                AttributeInfo::LocalVariableTable(table)
                | AttributeInfo::LocalVariableTypeTable(table) => table
                    .local_variables
                    .iter()
                    .map(Node::LocalVariable)
                    .collect(),
                AttributeInfo::InnerClasses(inner_classes) => inner_classes
                    .classes
                    .iter()
                    .map(Node::InnerClass)
                    .collect(),
                _ => Vec::new(),
            },
            Node::ConstantPool(constant_pool) => constant_pool
                .iter()
                .map(|(index, cp_info)| Node::Constant(index, cp_info))
                .collect(),
            Node::CodeException(_)
            | Node::LineNumber(_)
            | Node::LocalVariable(_)
            | Node::InnerClass(_)
            | Node::Constant(..) => Vec::new(),
        }
    }

    /// Calls the method of `visitor` that matches this node.
    pub fn accept<V: Visitor + ?Sized>(self, visitor: &mut V) {
        match self {
            Node::JavaClass(class) => visitor.visit_java_class(class),
            Node::Field(field) => visitor.visit_field(field),
            Node::Method(method) => visitor.visit_method(method),
            Node::Attribute(attribute) => visitor.visit_attribute(attribute),
            Node::CodeException(entry) => visitor.visit_code_exception(entry),
            Node::LineNumber(line_number) => visitor.visit_line_number(line_number),
            Node::LocalVariable(local_variable) => visitor.visit_local_variable(local_variable),
            Node::InnerClass(inner_class) => visitor.visit_inner_class(inner_class),
            Node::ConstantPool(constant_pool) => visitor.visit_constant_pool(constant_pool),
            Node::Constant(index, cp_info) => visitor.visit_constant(index, cp_info),
        }
    }
}

/// Calls the method of `visitor` that matches the kind of `attribute`.
pub fn dispatch_attribute<V: Visitor + ?Sized>(visitor: &mut V, attribute: &Attribute) {
    match attribute.info() {
        AttributeInfo::SourceFile(a) => visitor.visit_source_file(a),
        AttributeInfo::ConstantValue(a) => visitor.visit_constant_value(a),
        AttributeInfo::Code(a) => visitor.visit_code(a),
        AttributeInfo::Exceptions(a) => visitor.visit_exception_table(a),
        AttributeInfo::LineNumberTable(a) => visitor.visit_line_number_table(a),
        AttributeInfo::LocalVariableTable(a) => visitor.visit_local_variable_table(a),
        AttributeInfo::LocalVariableTypeTable(a) => visitor.visit_local_variable_type_table(a),
        AttributeInfo::InnerClasses(a) => visitor.visit_inner_classes(a),
        AttributeInfo::Synthetic(a) => visitor.visit_synthetic(a),
        AttributeInfo::Deprecated(a) => visitor.visit_deprecated(a),
        AttributeInfo::Signature(a) => visitor.visit_signature(a),
        AttributeInfo::EnclosingMethod(a) => visitor.visit_enclosing_method(a),
        AttributeInfo::NestHost(a) => visitor.visit_nest_host(a),
        AttributeInfo::NestMembers(a) => visitor.visit_nest_members(a),
        AttributeInfo::Custom(a) => visitor.visit_custom(&**a),
        AttributeInfo::Unknown(a) => visitor.visit_unknown(a),
    }
}

/// Callbacks for every kind of node. All of them do nothing by default.
///
/// `visit_attribute` hands the attribute to the method of its kind; override
/// it to see every attribute with its name and length.
#[allow(unused_variables)]
pub trait Visitor {
    /// Entry point used by [`DescendingVisitor`] for every node it reaches.
    fn visit_node(&mut self, node: Node<'_>, ancestors: &Ancestors<'_>) {
        node.accept(self)
    }

    fn visit_java_class(&mut self, class: &JavaClass) {}
    fn visit_field(&mut self, field: &Field) {}
    fn visit_method(&mut self, method: &Method) {}

    fn visit_attribute(&mut self, attribute: &Attribute) {
        dispatch_attribute(self, attribute)
    }

    fn visit_source_file(&mut self, source_file: &SourceFile) {}
    fn visit_constant_value(&mut self, constant_value: &ConstantValue) {}
    fn visit_code(&mut self, code: &Code) {}
    fn visit_exception_table(&mut self, exception_table: &ExceptionTable) {}
    fn visit_line_number_table(&mut self, line_number_table: &LineNumberTable) {}
    fn visit_local_variable_table(&mut self, local_variable_table: &LocalVariableTable) {}
    fn visit_local_variable_type_table(&mut self, table: &LocalVariableTable) {}
    fn visit_inner_classes(&mut self, inner_classes: &InnerClasses) {}
    fn visit_synthetic(&mut self, synthetic: &Synthetic) {}
    fn visit_deprecated(&mut self, deprecated: &Deprecated) {}
    fn visit_signature(&mut self, signature: &Signature) {}
    fn visit_enclosing_method(&mut self, enclosing_method: &EnclosingMethod) {}
    fn visit_nest_host(&mut self, nest_host: &NestHost) {}
    fn visit_nest_members(&mut self, nest_members: &NestMembers) {}
    fn visit_custom(&mut self, attribute: &dyn CustomAttribute) {}
    fn visit_unknown(&mut self, unknown: &Unknown) {}

    fn visit_code_exception(&mut self, code_exception: &CodeException) {}
    fn visit_line_number(&mut self, line_number: &LineNumber) {}
    fn visit_local_variable(&mut self, local_variable: &LocalVariable) {}
    fn visit_inner_class(&mut self, inner_class: &InnerClass) {}
    fn visit_constant_pool(&mut self, constant_pool: &ConstantPool) {}
    fn visit_constant(&mut self, index: u16, cp_info: &CpInfo) {}
}

/// The path from the root of a traversal to the node being visited.
#[derive(Debug, Default)]
pub struct Ancestors<'a> {
    stack: Vec<Node<'a>>,
}
impl<'a> Ancestors<'a> {
    /// The node being visited.
    pub fn current(&self) -> Option<Node<'a>> {
        self.stack.last().copied()
    }

    /// `predecessor(0)` is the parent of the current node, `predecessor(1)`
    /// its grandparent and so on. `None` past the root.
    pub fn predecessor(&self, level: usize) -> Option<Node<'a>> {
        let index = self.stack.len().checked_sub(level.checked_add(2)?)?;
        self.stack.get(index).copied()
    }

    /// Number of nodes on the path, the current one included.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Nodes from the root down to the current one.
    pub fn iter(&self) -> impl Iterator<Item = Node<'a>> + '_ {
        self.stack.iter().copied()
    }
}

/// Walks a whole class tree in pre-order and hands every node to the wrapped
/// visitor.
pub struct DescendingVisitor<'a, V> {
    visitor: V,
    ancestors: Ancestors<'a>,
}
impl<'a, V: Visitor> DescendingVisitor<'a, V> {
    pub fn new(visitor: V) -> Self {
        Self {
            visitor,
            ancestors: Ancestors::default(),
        }
    }

    pub fn visit(&mut self, class: &'a JavaClass) {
        self.visit_node(Node::JavaClass(class));
    }

    /// Walks the subtree rooted at `node`.
    pub fn visit_node(&mut self, node: Node<'a>) {
        self.ancestors.stack.push(node);
        self.visitor.visit_node(node, &self.ancestors);
        for child in node.children() {
            self.visit_node(child);
        }
        self.ancestors.stack.pop();
    }

    /// The node being visited, `None` outside of a traversal.
    pub fn current(&self) -> Option<Node<'a>> {
        self.ancestors.current()
    }

    pub fn predecessor(&self, level: usize) -> Option<Node<'a>> {
        self.ancestors.predecessor(level)
    }

    pub fn visitor(&self) -> &V {
        &self.visitor
    }

    pub fn visitor_mut(&mut self) -> &mut V {
        &mut self.visitor
    }

    pub fn into_inner(self) -> V {
        self.visitor
    }
}
