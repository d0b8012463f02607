use std::path::Path;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use crate::setup_py::lexer::{self, Token, TokenKind};
use crate::setup_py::{FindPackages, PyValue, SetupCall};

/// Statements whose header ends at a `:` and may have a body on the same line.
const BLOCK_KEYWORDS: &[&str] = &[
    "if", "elif", "else", "try", "except", "finally", "for", "while",
];

/// Names that never start a value reference.
const KEYWORDS: &[&str] = &[
    "True", "False", "None", "lambda", "not", "await", "yield", "if", "else", "for", "in", "is",
    "and", "or",
];

const BINARY_OPERATORS: &[&str] = &[
    "+", "-", "*", "/", "//", "%", "@", "|", "&", "^", "<<", ">>", "**",
];

/// Nesting limit for scripts that `exec()` other files.
const MAX_EXEC_DEPTH: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Module,
    /// Inside a `def` or `class` body; bindings never shadow module names.
    Function,
}

/// A `def` or `class` whose body is being read.
struct Block {
    indent: usize,
    /// The function's name; `None` for classes.
    name: Option<String>,
    opens: bool,
    reads: bool,
    transforms: bool,
}

impl Block {
    fn observe(&mut self, line: &[Token]) {
        for token in line {
            match token.name() {
                Some("open") => self.opens = true,
                Some("read") => self.reads = true,
                Some("read_text") => {
                    self.opens = true;
                    self.reads = true;
                }
                Some(
                    "re" | "exec" | "eval" | "search" | "match" | "findall" | "for" | "startswith"
                    | "split" | "splitlines" | "readlines" | "format" | "ast",
                ) => self.transforms = true,
                _ => {}
            }
        }
    }

    /// Whether the function returns the plain contents of a file it opens.
    fn returns_file_contents(&self) -> bool {
        self.opens && self.reads && !self.transforms
    }
}

pub(crate) struct Reader<'a> {
    script_name: &'a str,
    base_dir: Option<&'a Path>,
    names: FxHashMap<String, PyValue>,
    /// Functions defined by the script that return a file's contents.
    file_readers: FxHashSet<String>,
    setup: Option<SetupCall>,
    depth: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(script_name: &'a str, base_dir: Option<&'a Path>) -> Self {
        Self {
            script_name,
            base_dir,
            names: FxHashMap::default(),
            file_readers: FxHashSet::default(),
            setup: None,
            depth: 0,
        }
    }

    /// Read the module and return its last `setup()` call.
    pub(crate) fn read(mut self, tokens: &[Token]) -> Option<SetupCall> {
        self.run(tokens);
        self.setup
    }

    fn run(&mut self, tokens: &[Token]) {
        let mut block: Option<Block> = None;
        let lines = tokens
            .split(|token| token.kind == TokenKind::Newline)
            .filter(|line| !line.is_empty());

        for line in lines {
            let indent = line[0].column;
            if let Some(current) = &mut block {
                if indent > current.indent {
                    current.observe(line);
                    self.statement(line, Scope::Function);
                    continue;
                }
                if let Some(finished) = block.take() {
                    self.end_block(finished);
                }
            }

            if line[0].is_name("def") || line[0].is_name("class") {
                let mut opened = Block {
                    indent,
                    name: line[0]
                        .is_name("def")
                        .then(|| line.get(1).and_then(Token::name).map(str::to_owned))
                        .flatten(),
                    opens: false,
                    reads: false,
                    transforms: false,
                };
                opened.observe(&line[1..]);
                block = Some(opened);
                continue;
            }
            self.statement(line, Scope::Module);
        }

        if let Some(finished) = block {
            self.end_block(finished);
        }
    }

    fn end_block(&mut self, block: Block) {
        if block.returns_file_contents() {
            if let Some(name) = block.name {
                debug!("Treating `{name}()` as a function that reads a file");
                self.file_readers.insert(name);
            }
        }
    }

    fn statement(&mut self, line: &[Token], scope: Scope) {
        let Some(first) = line.first() else {
            return;
        };
        if first.is_op("@") {
            return;
        }
        match first.name() {
            Some("def" | "class") => return,
            Some("import" | "from" | "return" | "raise" | "del" | "assert" | "global" | "pass") => {
                self.find_setup(line);
                return;
            }
            Some("with") => {
                self.with_statement(line, scope);
                return;
            }
            Some("exec") if line.get(1).is_some_and(|token| token.is_op("(")) => {
                self.exec(&line[2..]);
                return;
            }
            Some(keyword) if BLOCK_KEYWORDS.contains(&keyword) => {
                if let Some(colon) = header_end(line) {
                    let body = &line[colon + 1..];
                    if !body.is_empty() {
                        self.statement(body, scope);
                    }
                }
                return;
            }
            _ => {}
        }

        if self.mutation(line) {
            return;
        }
        self.find_setup(line);
        self.assignment(line, scope);
    }

    fn bind(&mut self, name: &str, value: PyValue, scope: Scope) {
        trace!("Binding `{name}` to {value:?}");
        match scope {
            Scope::Module => {
                self.names.insert(name.to_owned(), value);
            }
            Scope::Function => {
                self.names.entry(name.to_owned()).or_insert(value);
            }
        }
    }

    /// `NAME = ...`, `A = B = ...`, `NAME: T = ...` and `NAME += ...`.
    fn assignment(&mut self, line: &[Token], scope: Scope) {
        if let (Some(name), Some(op)) = (line[0].name(), line.get(1)) {
            if op.is_op("+=") {
                let mut cursor = Cursor::new(&line[2..]);
                let value = self.complete_expression(&mut cursor);
                let current = self.names.get(name).cloned().unwrap_or(PyValue::Unknown);
                self.bind(name, binary("+", current, value), scope);
                return;
            }
        }

        let mut targets = Vec::new();
        let mut index = 0;
        while let (Some(name), Some(op)) = (
            line.get(index).and_then(Token::name),
            line.get(index + 1),
        ) {
            if !op.is_op("=") {
                break;
            }
            targets.push(name);
            index += 2;
        }

        if targets.is_empty() && line.len() > 2 && line[1].is_op(":") {
            if let (Some(name), Some(equals)) = (
                line[0].name(),
                line.iter().position(|token| token.is_op("=")),
            ) {
                targets.push(name);
                index = equals + 1;
            }
        }

        if targets.is_empty() {
            return;
        }
        let mut cursor = Cursor::new(&line[index..]);
        let value = self.complete_expression(&mut cursor);
        for target in targets {
            self.bind(target, value.clone(), scope);
        }
    }

    /// `NAME.append(...)`, `NAME.extend(...)` and `NAME.update(...)`.
    fn mutation(&mut self, line: &[Token]) -> bool {
        let [target, dot, method, open, ..] = line else {
            return false;
        };
        let (Some(target), Some(method)) = (target.name(), method.name()) else {
            return false;
        };
        if !dot.is_op(".") || !open.is_op("(") || !matches!(method, "append" | "extend" | "update")
        {
            return false;
        }

        let mut cursor = Cursor::new(&line[4..]);
        let argument = self.arguments(&mut cursor).positional.into_iter().next();
        let Some(current) = self.names.get_mut(target) else {
            return true;
        };
        match (current, method, argument) {
            (PyValue::List(items), "append", Some(value)) => items.push(value),
            (PyValue::List(items), "extend", Some(PyValue::List(values))) => items.extend(values),
            (PyValue::Dict(items), "update", Some(PyValue::Dict(values))) => {
                for (key, value) in values {
                    insert_item(items, key, value);
                }
            }
            (current, _, _) => *current = PyValue::Unknown,
        }
        true
    }

    /// `with EXPR as NAME, ...:` binds each name to its context value.
    fn with_statement(&mut self, line: &[Token], scope: Scope) {
        let Some(colon) = header_end(line) else {
            return;
        };
        let mut cursor = Cursor::new(&line[1..colon]);
        loop {
            let value = self.expression(&mut cursor);
            if cursor.eat_name("as") {
                if let Some(name) = cursor.bump().and_then(Token::name) {
                    self.bind(name, value, scope);
                }
            }
            if !cursor.eat_op(",") {
                break;
            }
        }

        let body = &line[colon + 1..];
        if !body.is_empty() {
            self.statement(body, scope);
        }
    }

    /// `exec(CODE, NAMESPACE)` with a statically known `CODE` fills the
    /// namespace dict with the code's module-level assignments.
    fn exec(&mut self, arguments: &[Token]) {
        let mut cursor = Cursor::new(arguments);
        let code = self.expression(&mut cursor);
        let namespace = if cursor.eat_op(",") {
            cursor.bump().and_then(Token::name)
        } else {
            None
        };
        let (Some(namespace), PyValue::Str(code) | PyValue::FileContents { contents: Some(code), .. }) =
            (namespace, code)
        else {
            return;
        };
        if self.depth >= MAX_EXEC_DEPTH {
            return;
        }
        let tokens = match lexer::tokenize(&code) {
            Ok(tokens) => tokens,
            Err(err) => {
                debug!("Skipping `exec()` of code that failed to tokenize: {err}");
                return;
            }
        };

        let mut module = Reader::new(self.script_name, self.base_dir);
        module.depth = self.depth + 1;
        module.run(&tokens);
        let mut names: Vec<_> = module.names.into_iter().collect();
        names.sort_by(|(a, _), (b, _)| a.cmp(b));

        let target = self
            .names
            .entry(namespace.to_owned())
            .or_insert_with(|| PyValue::Dict(Vec::new()));
        match target {
            PyValue::Dict(items) => {
                for (name, value) in names {
                    insert_item(items, PyValue::Str(name), value);
                }
            }
            other => *other = PyValue::Unknown,
        }
    }

    /// Look for `setup(...)`, `setuptools.setup(...)` or `core.setup(...)`.
    fn find_setup(&mut self, line: &[Token]) {
        for index in 0..line.len() {
            if !line[index].is_name("setup") || !line.get(index + 1).is_some_and(|t| t.is_op("(")) {
                continue;
            }
            if index > 0 {
                let previous = &line[index - 1];
                if previous.is_name("def") {
                    continue;
                }
                let qualified = index >= 2
                    && (line[index - 2].is_name("setuptools") || line[index - 2].is_name("core"));
                if previous.is_op(".") && !qualified {
                    continue;
                }
            }

            let mut cursor = Cursor::new(&line[index + 2..]);
            let arguments = self.arguments(&mut cursor);
            let mut call = SetupCall::default();
            for (key, value) in arguments.keywords {
                call.insert(key, value);
            }
            call.notes = arguments.notes;
            if !arguments.positional.is_empty() {
                call.notes
                    .push("positional arguments to `setup()` were ignored".to_owned());
            }
            debug!(
                "Found `setup()` call on line {} with {} keyword arguments",
                line[index].line,
                call.keywords.len()
            );
            self.setup = Some(call);
            return;
        }
    }

    /// Parse call arguments up to and including the closing `)`.
    fn arguments(&self, cursor: &mut Cursor) -> Arguments {
        let mut arguments = Arguments::default();
        loop {
            if cursor.eat_op(")") || cursor.is_done() {
                break;
            }

            if cursor.eat_op("**") {
                let name = cursor.peek().and_then(Token::name).unwrap_or("...");
                match self.expression(cursor) {
                    PyValue::Dict(items) => {
                        for (key, value) in items {
                            match key {
                                PyValue::Str(key) => arguments.keywords.push((key, value)),
                                _ => arguments
                                    .notes
                                    .push(format!("a non-string key in `**{name}` was ignored")),
                            }
                        }
                    }
                    _ => arguments
                        .notes
                        .push(format!("`**{name}` could not be expanded statically")),
                }
            } else if cursor.eat_op("*") {
                match self.expression(cursor) {
                    PyValue::List(items) => arguments.positional.extend(items),
                    _ => arguments.positional.push(PyValue::Unknown),
                }
            } else if let (Some(name), true) = (
                cursor.peek().and_then(Token::name),
                cursor.peek_nth(1).is_some_and(|token| token.is_op("=")),
            ) {
                cursor.advance(2);
                let value = self.expression(cursor);
                arguments.keywords.push((name.to_owned(), value));
            } else {
                let value = self.expression(cursor);
                arguments.positional.push(value);
            }

            if cursor.at_name("for") {
                // A generator expression argument.
                cursor.skip_group();
                if let Some(last) = arguments.positional.last_mut() {
                    *last = PyValue::Unknown;
                }
            }
            if !cursor.eat_op(",") {
                cursor.skip_group();
                cursor.eat_op(")");
                break;
            }
        }
        arguments
    }

    /// Evaluate an expression that must span the rest of the tokens.
    fn complete_expression(&self, cursor: &mut Cursor) -> PyValue {
        let value = self.expression(cursor);
        if cursor.is_done() {
            value
        } else {
            PyValue::Unknown
        }
    }

    /// Evaluate one expression, stopping at a delimiter.
    fn expression(&self, cursor: &mut Cursor) -> PyValue {
        if cursor.eat_name("lambda") {
            while let Some(token) = cursor.bump() {
                if token.is_op(":") {
                    break;
                }
            }
            cursor.skip_expression();
            return PyValue::Unknown;
        }

        let mut value = self.unary(cursor);
        loop {
            let Some(op) = cursor.peek().and_then(|token| match token.kind {
                TokenKind::Op(op) if BINARY_OPERATORS.contains(&op) => Some(op),
                _ => None,
            }) else {
                break;
            };
            cursor.bump();
            let right = self.unary(cursor);
            value = binary(op, value, right);
        }

        if cursor.at_delimiter() {
            value
        } else {
            cursor.skip_expression();
            PyValue::Unknown
        }
    }

    fn unary(&self, cursor: &mut Cursor) -> PyValue {
        if cursor.eat_op("-") {
            return match self.unary(cursor) {
                PyValue::Number(number) => PyValue::Number(format!("-{number}")),
                _ => PyValue::Unknown,
            };
        }
        if cursor.eat_op("+") {
            return self.unary(cursor);
        }
        if cursor.eat_op("~") {
            self.unary(cursor);
            return PyValue::Unknown;
        }
        self.postfix(cursor)
    }

    fn postfix(&self, cursor: &mut Cursor) -> PyValue {
        // Dotted names are taken whole so that `os.path.join` can be recognized.
        let mut value = match dotted_name(cursor) {
            Some(path) if cursor.eat_op("(") => {
                let arguments = self.arguments(cursor);
                self.call(&path, arguments)
            }
            Some(path) => self.resolve(&path),
            None => self.atom(cursor),
        };

        loop {
            if cursor.eat_op(".") {
                let Some(name) = cursor.bump().and_then(Token::name) else {
                    return PyValue::Unknown;
                };
                if cursor.eat_op("(") {
                    let arguments = self.arguments(cursor);
                    value = self.method(value, name, arguments);
                } else {
                    value = attribute(value, name);
                }
            } else if cursor.eat_op("(") {
                self.arguments(cursor);
                value = PyValue::Unknown;
            } else if cursor.eat_op("[") {
                value = self.subscript(value, cursor);
            } else {
                return value;
            }
        }
    }

    fn atom(&self, cursor: &mut Cursor) -> PyValue {
        let Some(token) = cursor.bump() else {
            return PyValue::Unknown;
        };
        match &token.kind {
            TokenKind::Str { value, formatted } => {
                let mut text = value.clone();
                let mut known = !formatted;
                // Adjacent literals concatenate.
                while let Some(Token {
                    kind: TokenKind::Str { value, formatted },
                    ..
                }) = cursor.peek()
                {
                    cursor.bump();
                    text.push_str(value);
                    known &= !formatted;
                }
                if known {
                    PyValue::Str(text)
                } else {
                    PyValue::Unknown
                }
            }
            TokenKind::Number(number) => PyValue::Number(number.clone()),
            TokenKind::Name(name) => match name.as_str() {
                "True" => PyValue::Bool(true),
                "False" => PyValue::Bool(false),
                "None" => PyValue::None,
                _ => {
                    cursor.skip_expression();
                    PyValue::Unknown
                }
            },
            TokenKind::Op("(") => self.collection(cursor, ")"),
            TokenKind::Op("[") => self.collection(cursor, "]"),
            TokenKind::Op("{") => self.braces(cursor),
            _ => {
                cursor.skip_expression();
                PyValue::Unknown
            }
        }
    }

    /// A parenthesized expression, tuple or list, after its opening bracket.
    fn collection(&self, cursor: &mut Cursor, close: &'static str) -> PyValue {
        let mut items = Vec::new();
        let mut trailing_comma = false;
        loop {
            if cursor.eat_op(close) {
                break;
            }
            if cursor.is_done() {
                return PyValue::Unknown;
            }

            if cursor.eat_op("*") {
                match self.expression(cursor) {
                    PyValue::List(values) => items.extend(values),
                    _ => items.push(PyValue::Unknown),
                }
            } else {
                items.push(self.expression(cursor));
            }

            if cursor.at_name("for") {
                cursor.skip_group();
                cursor.eat_op(close);
                return PyValue::Unknown;
            }
            trailing_comma = cursor.eat_op(",");
            if !trailing_comma {
                if cursor.eat_op(close) {
                    break;
                }
                cursor.skip_group();
                cursor.eat_op(close);
                return PyValue::Unknown;
            }
        }

        if close == ")" && items.len() == 1 && !trailing_comma {
            return items.pop().unwrap_or(PyValue::Unknown);
        }
        PyValue::List(items)
    }

    /// A dict or set display, after its opening brace.
    fn braces(&self, cursor: &mut Cursor) -> PyValue {
        let mut items = Vec::new();
        let mut set = Vec::new();
        loop {
            if cursor.eat_op("}") {
                break;
            }
            if cursor.is_done() {
                return PyValue::Unknown;
            }

            if cursor.eat_op("**") {
                match self.expression(cursor) {
                    PyValue::Dict(values) => {
                        for (key, value) in values {
                            insert_item(&mut items, key, value);
                        }
                    }
                    _ => {
                        cursor.skip_group();
                        cursor.eat_op("}");
                        return PyValue::Unknown;
                    }
                }
            } else {
                let key = self.expression(cursor);
                if cursor.eat_op(":") {
                    let value = self.expression(cursor);
                    insert_item(&mut items, key, value);
                } else {
                    set.push(key);
                }
            }

            if cursor.at_name("for") {
                cursor.skip_group();
                cursor.eat_op("}");
                return PyValue::Unknown;
            }
            if !cursor.eat_op(",") {
                if cursor.eat_op("}") {
                    break;
                }
                cursor.skip_group();
                cursor.eat_op("}");
                return PyValue::Unknown;
            }
        }

        match (items.is_empty(), set.is_empty()) {
            (_, true) => PyValue::Dict(items),
            (true, false) => PyValue::List(set),
            (false, false) => PyValue::Unknown,
        }
    }

    /// `value[index]`, after the opening bracket.
    fn subscript(&self, value: PyValue, cursor: &mut Cursor) -> PyValue {
        let index = self.expression(cursor);
        if !cursor.eat_op("]") {
            cursor.skip_group();
            cursor.eat_op("]");
            return PyValue::Unknown;
        }
        match (value, index) {
            (PyValue::Dict(items), key) => items
                .into_iter()
                .find_map(|(k, v)| (k == key).then_some(v))
                .unwrap_or(PyValue::Unknown),
            (PyValue::List(items), PyValue::Number(number)) => number
                .parse::<usize>()
                .ok()
                .and_then(|index| items.into_iter().nth(index))
                .unwrap_or(PyValue::Unknown),
            _ => PyValue::Unknown,
        }
    }

    fn resolve(&self, path: &[&str]) -> PyValue {
        let [first, rest @ ..] = path else {
            return PyValue::Unknown;
        };
        let mut value = match *first {
            "__file__" => PyValue::Path(self.script_name.to_owned()),
            name => match self.names.get(name) {
                Some(value) => value.clone(),
                None => {
                    trace!("Name `{name}` is not known statically");
                    PyValue::Unknown
                }
            },
        };
        for name in rest {
            value = attribute(value, name);
        }
        value
    }

    fn call(&self, path: &[&str], arguments: Arguments) -> PyValue {
        if let [name] = path {
            if self.file_readers.contains(*name) {
                return self.read_parts(&arguments.positional);
            }
        }
        if let Some(value) = self.builtin(path, &arguments) {
            return value;
        }
        if let [receiver @ .., method] = path {
            if receiver
                .first()
                .is_some_and(|name| self.names.contains_key(*name) || *name == "__file__")
            {
                let value = self.resolve(receiver);
                return self.method(value, method, arguments);
            }
        }
        trace!("Call to `{}()` is not known statically", path.join("."));
        PyValue::Unknown
    }

    /// Calls to well-known functions of the standard library and setuptools.
    fn builtin(&self, path: &[&str], arguments: &Arguments) -> Option<PyValue> {
        let positional = &arguments.positional;
        let value = match path.join(".").as_str() {
            "open" | "io.open" | "codecs.open" => arguments
                .get(0, "file")
                .and_then(path_of)
                .map(PyValue::File)
                .unwrap_or(PyValue::Unknown),
            "os.path.join" | "Path" | "pathlib.Path" | "PurePath" | "pathlib.PurePath" => {
                join_values(positional)
            }
            "os.path.dirname" => match positional.first().and_then(path_of) {
                Some(path) => PyValue::Path(parent(&path)),
                None => PyValue::Unknown,
            },
            "os.path.abspath" | "os.path.realpath" | "os.path.normpath" | "os.fspath" => {
                match positional.first().and_then(path_of) {
                    Some(path) => PyValue::Path(path),
                    None => PyValue::Unknown,
                }
            }
            "os.getcwd" => PyValue::Path(String::new()),
            "find_packages" | "setuptools.find_packages" => find_packages(arguments, false),
            "find_namespace_packages"
            | "setuptools.find_namespace_packages"
            | "PEP420PackageFinder.find"
            | "setuptools.PEP420PackageFinder.find" => find_packages(arguments, true),
            "dict" => {
                let mut items = match positional.first() {
                    Some(PyValue::Dict(items)) => items.clone(),
                    Some(_) => return Some(PyValue::Unknown),
                    None => Vec::new(),
                };
                for (key, value) in &arguments.keywords {
                    insert_item(&mut items, PyValue::Str(key.clone()), value.clone());
                }
                PyValue::Dict(items)
            }
            "list" | "tuple" | "set" | "frozenset" => match positional.first() {
                Some(PyValue::List(items)) => PyValue::List(items.clone()),
                None => PyValue::List(Vec::new()),
                Some(_) => PyValue::Unknown,
            },
            "sorted" => match positional.first() {
                Some(PyValue::List(items)) => {
                    let mut strings = Vec::with_capacity(items.len());
                    for item in items {
                        match item {
                            PyValue::Str(text) => strings.push(text.clone()),
                            _ => return Some(PyValue::Unknown),
                        }
                    }
                    strings.sort();
                    PyValue::List(strings.into_iter().map(PyValue::Str).collect())
                }
                _ => PyValue::Unknown,
            },
            "str" => match positional.first() {
                Some(PyValue::Str(text) | PyValue::Path(text) | PyValue::Number(text)) => {
                    PyValue::Str(text.clone())
                }
                _ => PyValue::Unknown,
            },
            _ => return None,
        };
        Some(value)
    }

    fn method(&self, value: PyValue, name: &str, arguments: Arguments) -> PyValue {
        match (value, name) {
            (PyValue::File(path), "read") => self.read_file(path),
            (PyValue::File(path), "readlines") => match self.read_file(path) {
                PyValue::FileContents {
                    contents: Some(text),
                    ..
                } => lines(&text),
                _ => PyValue::Unknown,
            },
            (PyValue::Path(path), "read_text") => self.read_file(path),
            (PyValue::Path(path), "joinpath") => {
                let mut parts = vec![PyValue::Path(path)];
                parts.extend(arguments.positional);
                join_values(&parts)
            }
            (PyValue::Path(path), "resolve" | "absolute") => PyValue::Path(path),
            (
                PyValue::FileContents { path, contents },
                "strip" | "rstrip" | "lstrip" | "decode",
            ) => PyValue::FileContents { path, contents },
            (
                PyValue::FileContents {
                    contents: Some(text),
                    ..
                }
                | PyValue::Str(text),
                method,
            ) => string_method(&text, method, &arguments),
            (PyValue::Dict(items), "get") => {
                let default = arguments
                    .positional
                    .get(1)
                    .cloned()
                    .unwrap_or(PyValue::None);
                match arguments.positional.first() {
                    Some(key) => items
                        .into_iter()
                        .find_map(|(k, v)| (k == *key).then_some(v))
                        .unwrap_or(default),
                    None => PyValue::Unknown,
                }
            }
            (value @ (PyValue::Dict(_) | PyValue::List(_)), "copy") => value,
            _ => PyValue::Unknown,
        }
    }

    fn read_file(&self, path: String) -> PyValue {
        let contents = self.base_dir.and_then(|dir| {
            match fs_err::read_to_string(dir.join(&path)) {
                Ok(contents) => Some(contents),
                Err(err) => {
                    debug!("Could not read a file used by the setup script: {err}");
                    None
                }
            }
        });
        PyValue::FileContents { path, contents }
    }

    /// A script-defined reader function called with path parts.
    fn read_parts(&self, parts: &[PyValue]) -> PyValue {
        match join_values(parts) {
            PyValue::Path(path) if !path.is_empty() => self.read_file(path),
            _ => PyValue::Unknown,
        }
    }
}

#[derive(Debug, Default)]
struct Arguments {
    positional: Vec<PyValue>,
    keywords: Vec<(String, PyValue)>,
    notes: Vec<String>,
}

impl Arguments {
    /// The argument passed by keyword `name` or at position `index`.
    fn get(&self, index: usize, name: &str) -> Option<&PyValue> {
        self.keywords
            .iter()
            .find_map(|(key, value)| (key == name).then_some(value))
            .or_else(|| self.positional.get(index))
    }
}

struct Cursor<'t> {
    tokens: &'t [Token],
    position: usize,
}

impl<'t> Cursor<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.position)
    }

    fn peek_nth(&self, n: usize) -> Option<&'t Token> {
        self.tokens.get(self.position + n)
    }

    fn bump(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.position)?;
        self.position += 1;
        Some(token)
    }

    fn advance(&mut self, n: usize) {
        self.position = (self.position + n).min(self.tokens.len());
    }

    fn is_done(&self) -> bool {
        self.position >= self.tokens.len()
    }

    fn eat_op(&mut self, op: &str) -> bool {
        let matched = self.peek().is_some_and(|token| token.is_op(op));
        if matched {
            self.position += 1;
        }
        matched
    }

    fn at_op(&self, op: &str) -> bool {
        self.peek().is_some_and(|token| token.is_op(op))
    }

    fn at_name(&self, name: &str) -> bool {
        self.peek().is_some_and(|token| token.is_name(name))
    }

    fn eat_name(&mut self, name: &str) -> bool {
        let matched = self.at_name(name);
        if matched {
            self.position += 1;
        }
        matched
    }

    /// Whether the next token ends an expression.
    fn at_delimiter(&self) -> bool {
        match self.peek() {
            None => true,
            Some(token) => {
                matches!(token.kind, TokenKind::Op("," | ")" | "]" | "}" | ":" | "="))
                    || token.is_name("for")
                    || token.is_name("as")
            }
        }
    }

    /// Skip to the next `,` or `:` at this nesting level, or to the closing
    /// bracket of the enclosing group.
    fn skip_expression(&mut self) {
        self.skip(true);
    }

    /// Skip to the closing bracket of the enclosing group.
    fn skip_group(&mut self) {
        self.skip(false);
    }

    fn skip(&mut self, stop_at_separator: bool) {
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::Op("(" | "[" | "{") => depth += 1,
                TokenKind::Op(")" | "]" | "}") => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                }
                TokenKind::Op("," | ":") if depth == 0 && stop_at_separator => return,
                _ => {}
            }
            self.position += 1;
        }
    }
}

/// Consume `NAME(.NAME)*` unless the next token is a keyword or not a name.
fn dotted_name<'t>(cursor: &mut Cursor<'t>) -> Option<Vec<&'t str>> {
    let name = cursor.peek()?.name()?;
    if KEYWORDS.contains(&name) {
        return None;
    }
    cursor.bump();
    let mut path = vec![name];
    while cursor.at_op(".") {
        let Some(next) = cursor.peek_nth(1).and_then(Token::name) else {
            break;
        };
        cursor.advance(2);
        path.push(next);
    }
    Some(path)
}

/// Index of the `:` ending a compound statement header.
fn header_end(line: &[Token]) -> Option<usize> {
    let mut depth = 0usize;
    for (index, token) in line.iter().enumerate() {
        match token.kind {
            TokenKind::Op("(" | "[" | "{") => depth += 1,
            TokenKind::Op(")" | "]" | "}") => depth = depth.saturating_sub(1),
            TokenKind::Op(":") if depth == 0 => return Some(index),
            _ => {}
        }
    }
    None
}

fn insert_item(items: &mut Vec<(PyValue, PyValue)>, key: PyValue, value: PyValue) {
    match items.iter_mut().find(|(k, _)| *k == key) {
        Some((_, existing)) => *existing = value,
        None => items.push((key, value)),
    }
}

fn binary(op: &str, left: PyValue, right: PyValue) -> PyValue {
    match (op, left, right) {
        (
            "+",
            PyValue::Str(left)
            | PyValue::FileContents {
                contents: Some(left),
                ..
            },
            PyValue::Str(right)
            | PyValue::FileContents {
                contents: Some(right),
                ..
            },
        ) => PyValue::Str(left + &right),
        ("+", PyValue::List(mut left), PyValue::List(right)) => {
            left.extend(right);
            PyValue::List(left)
        }
        ("/", PyValue::Path(left), PyValue::Str(right) | PyValue::Path(right)) => {
            PyValue::Path(join_path(&left, &right))
        }
        _ => PyValue::Unknown,
    }
}

fn attribute(value: PyValue, name: &str) -> PyValue {
    match (value, name) {
        (PyValue::Path(path), "parent") => PyValue::Path(parent(&path)),
        (PyValue::Path(path), "name") => PyValue::Str(
            path.rsplit_once('/')
                .map_or(path.as_str(), |(_, name)| name)
                .to_owned(),
        ),
        _ => PyValue::Unknown,
    }
}

fn string_method(text: &str, method: &str, arguments: &Arguments) -> PyValue {
    let first = arguments.positional.first();
    match (method, first) {
        ("split", None | Some(PyValue::None)) => strings(text.split_whitespace()),
        ("split", Some(PyValue::Str(separator))) => strings(text.split(separator.as_str())),
        ("splitlines", None) => lines(text),
        ("strip", None) => PyValue::Str(text.trim().to_owned()),
        ("lstrip", None) => PyValue::Str(text.trim_start().to_owned()),
        ("rstrip", None) => PyValue::Str(text.trim_end().to_owned()),
        ("strip", Some(PyValue::Str(chars))) => {
            PyValue::Str(text.trim_matches(|c| chars.contains(c)).to_owned())
        }
        ("lower", None) => PyValue::Str(text.to_lowercase()),
        ("upper", None) => PyValue::Str(text.to_uppercase()),
        ("decode" | "encode", _) => PyValue::Str(text.to_owned()),
        ("replace", Some(PyValue::Str(from))) => match arguments.positional.get(1) {
            Some(PyValue::Str(to)) => PyValue::Str(text.replace(from.as_str(), to)),
            _ => PyValue::Unknown,
        },
        ("join", Some(PyValue::List(items))) => {
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    PyValue::Str(part) => parts.push(part.as_str()),
                    _ => return PyValue::Unknown,
                }
            }
            PyValue::Str(parts.join(text))
        }
        _ => PyValue::Unknown,
    }
}

fn strings<'s>(parts: impl Iterator<Item = &'s str>) -> PyValue {
    PyValue::List(parts.map(|part| PyValue::Str(part.to_owned())).collect())
}

fn lines(text: &str) -> PyValue {
    strings(text.lines())
}

/// The path named by a string or path value.
fn path_of(value: &PyValue) -> Option<String> {
    match value {
        PyValue::Str(path) | PyValue::Path(path) => Some(path.clone()),
        _ => None,
    }
}

fn join_values(parts: &[PyValue]) -> PyValue {
    let mut joined = String::new();
    for part in parts {
        let Some(part) = path_of(part) else {
            return PyValue::Unknown;
        };
        joined = join_path(&joined, &part);
    }
    PyValue::Path(joined)
}

fn join_path(base: &str, part: &str) -> String {
    let part = part.trim_start_matches("./");
    if base.is_empty() || part.starts_with('/') {
        part.to_owned()
    } else if part.is_empty() {
        base.to_owned()
    } else {
        format!("{}/{part}", base.trim_end_matches('/'))
    }
}

fn parent(path: &str) -> String {
    path.rsplit_once('/')
        .map(|(parent, _)| parent.to_owned())
        .unwrap_or_default()
}

fn find_packages(arguments: &Arguments, namespace: bool) -> PyValue {
    fn string_list(value: Option<&PyValue>) -> Option<Vec<String>> {
        match value {
            None | Some(PyValue::None) => Some(Vec::new()),
            Some(PyValue::Str(item)) => Some(vec![item.clone()]),
            Some(PyValue::List(items)) => items
                .iter()
                .map(|item| item.as_str().map(str::to_owned))
                .collect(),
            Some(_) => None,
        }
    }

    let r#where = match arguments.get(0, "where") {
        None => None,
        Some(value) => match path_of(value) {
            Some(path) if path.is_empty() || path == "." => None,
            Some(path) => Some(path),
            None => return PyValue::Unknown,
        },
    };
    let (Some(exclude), Some(include)) = (
        string_list(arguments.get(1, "exclude")),
        string_list(arguments.get(2, "include")),
    ) else {
        return PyValue::Unknown;
    };
    PyValue::FindPackages(FindPackages {
        namespace,
        r#where,
        include,
        exclude,
    })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use crate::setup_py::{read_setup_call, Error, FindPackages, PyValue, SetupCall};

    fn read(source: &str) -> SetupCall {
        read_setup_call(source, "setup.py", None).unwrap()
    }

    fn read_in(dir: &Path, source: &str) -> SetupCall {
        read_setup_call(source, "setup.py", Some(dir)).unwrap()
    }

    fn string(value: &str) -> PyValue {
        PyValue::Str(value.to_owned())
    }

    #[test]
    fn literal_keywords() {
        let call = read(
            r#"
from setuptools import setup, find_packages

setup(
    name="demo",
    version='1.0',
    zip_safe=False,
    install_requires=["requests>=2", 'click'],
    packages=find_packages(exclude=("tests", "tests.*")),
    python_requires=">=3.8",
)
"#,
        );
        assert_eq!(call.get("name"), Some(&string("demo")));
        assert_eq!(call.get("version"), Some(&string("1.0")));
        assert_eq!(call.get("zip_safe"), Some(&PyValue::Bool(false)));
        assert_eq!(
            call.get("install_requires"),
            Some(&PyValue::List(vec![string("requests>=2"), string("click")]))
        );
        assert_eq!(
            call.get("packages"),
            Some(&PyValue::FindPackages(FindPackages {
                namespace: false,
                r#where: None,
                include: vec![],
                exclude: vec!["tests".to_owned(), "tests.*".to_owned()],
            }))
        );
        let keys: Vec<_> = call.keywords().map(|(key, _)| key).collect();
        assert_eq!(
            keys,
            ["name", "version", "zip_safe", "install_requires", "packages", "python_requires"]
        );
    }

    #[test]
    fn names_and_keyword_expansion() {
        let call = read(
            r#"
import setuptools
VERSION = "2." + "0"
requires = ["a"]
requires += ["b"]
requires.append("c")
metadata = dict(name="demo", version=VERSION)
extras = {"test": ["pytest"], **{"docs": ["sphinx"]}}

if __name__ == "__main__":
    setuptools.setup(**metadata, install_requires=requires, extras_require=extras, license="MIT")
"#,
        );
        assert_eq!(call.get("version"), Some(&string("2.0")));
        assert_eq!(
            call.get("install_requires"),
            Some(&PyValue::List(vec![string("a"), string("b"), string("c")]))
        );
        assert_eq!(
            call.get("extras_require"),
            Some(&PyValue::Dict(vec![
                (string("test"), PyValue::List(vec![string("pytest")])),
                (string("docs"), PyValue::List(vec![string("sphinx")])),
            ]))
        );
        assert_eq!(call.get("license"), Some(&string("MIT")));
    }

    #[test]
    fn files_read_next_to_the_script() {
        let dir = tempfile::tempdir().unwrap();
        fs_err::write(dir.path().join("README.md"), "# Demo\n").unwrap();
        fs_err::write(dir.path().join("CHANGES.rst"), "Changes\n").unwrap();

        let call = read_in(
            dir.path(),
            r#"
import io, os
from pathlib import Path

here = os.path.abspath(os.path.dirname(__file__))
with io.open(os.path.join(here, "README.md"), encoding="utf-8") as f:
    readme = f.read()

def read(*parts):
    return open(os.path.join(here, *parts)).read()

setup(
    long_description=readme,
    description=(Path(__file__).parent / "README.md").read_text().strip(),
    license=read("CHANGES.rst"),
    keywords="one two  three".split(),
)
"#,
        );
        assert_eq!(
            call.get("long_description"),
            Some(&PyValue::FileContents {
                path: "README.md".to_owned(),
                contents: Some("# Demo\n".to_owned()),
            })
        );
        assert!(matches!(
            call.get("description"),
            Some(PyValue::FileContents { path, .. }) if path == "README.md"
        ));
        assert!(matches!(
            call.get("license"),
            Some(PyValue::FileContents { path, contents: Some(_) }) if path == "CHANGES.rst"
        ));
        assert_eq!(
            call.get("keywords"),
            Some(&PyValue::List(vec![
                string("one"),
                string("two"),
                string("three")
            ]))
        );
    }

    #[test]
    fn exec_fills_a_namespace() {
        let dir = tempfile::tempdir().unwrap();
        fs_err::create_dir(dir.path().join("demo")).unwrap();
        fs_err::write(
            dir.path().join("demo").join("__about__.py"),
            "__version__ = '3.1.4'\n__author__ = 'Jane'\n",
        )
        .unwrap();

        let call = read_in(
            dir.path(),
            r#"
about = {}
with open("demo/__about__.py") as fp:
    exec(fp.read(), about)

setup(version=about["__version__"], author=about.get("__author__"))
"#,
        );
        assert_eq!(call.get("version"), Some(&string("3.1.4")));
        assert_eq!(call.get("author"), Some(&string("Jane")));
    }

    #[test]
    fn dynamic_values_are_unknown() {
        let call = read(
            r#"
import re

def get_version():
    with open("demo/__init__.py") as f:
        return re.search(r"__version__ = '(.*)'", f.read()).group(1)

setup(
    name=f"demo-{get_version()}",
    version=get_version(),
    classifiers=[c for c in CLASSIFIERS if c],
    zip_safe=True if FAST else False,
    url="https://example.com",
)
"#,
        );
        assert_eq!(call.get("name"), Some(&PyValue::Unknown));
        assert_eq!(call.get("version"), Some(&PyValue::Unknown));
        assert_eq!(call.get("classifiers"), Some(&PyValue::Unknown));
        assert_eq!(call.get("zip_safe"), Some(&PyValue::Unknown));
        assert_eq!(call.get("url"), Some(&string("https://example.com")));
    }

    #[test]
    fn unexpandable_keywords_are_noted() {
        let call = read("setup(name='x', **get_kwargs())\n");
        assert_eq!(call.get("name"), Some(&string("x")));
        assert_eq!(call.notes(), ["`**get_kwargs` could not be expanded statically"]);
    }

    #[test]
    fn only_setup_calls_count() {
        assert!(matches!(
            read_setup_call("def setup():\n    pass\n\nfoo.setup(name='x')\n", "setup.py", None),
            Err(Error::MissingSetupCall)
        ));

        let call = read("import distutils.core\ndistutils.core.setup(name='old')\n");
        assert_eq!(call.get("name"), Some(&string("old")));
    }

    #[test]
    fn setup_inside_a_function_uses_module_names() {
        let call = read(
            r#"
NAME = "demo"

def main():
    NAME = "shadowed"
    setup(name=NAME)

main()
"#,
        );
        assert_eq!(call.get("name"), Some(&string("demo")));
    }

    #[test]
    fn tokenize_errors_carry_lines() {
        let err = read_setup_call("setup(\n    name='demo,\n)\n", "setup.py", None).unwrap_err();
        assert_eq!(err.to_string(), "line 2: unterminated string literal");
    }
}
