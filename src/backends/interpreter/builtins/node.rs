//! Node.js host modules: `process`, `node:fs`, `node:fs/promises`, `node:path`
//!
//! Only the synchronous file API and the promise API are provided; callback
//! style `fs` functions are not. Paths follow POSIX rules.

use std::fs;
use std::io;
use std::time::UNIX_EPOCH;

use super::define_async;
use super::typed_array::new_typed;
use crate::backends::interpreter::property::describe_value;
use crate::backends::interpreter::{ErrorKind, Interpreter, JsResult, Throw};
use crate::frontend::module::VirtualModule;
use crate::runtime::value::{CallArgs, Obj, Property, PropertyKey, Slot, TypedKind, Value};

pub(crate) fn install(interp: &Interpreter) {
    let process = interp.new_object();
    let env = interp.new_object();
    for (key, value) in std::env::vars() {
        interp.create_data_property(&env, key.as_str(), Value::from(value));
    }
    {
        let mut object = process.lock();
        object.insert("env", Value::Object(env));
        object.insert("platform", Value::str(node_platform()));
        object.insert("version", Value::str("v20.0.0"));
        object.insert("argv", Value::Object(interp.new_array(Vec::new())));
    }
    let versions = interp.object_from(vec![("node", Value::str("20.0.0"))]);
    process.lock().insert("versions", Value::Object(versions));
    interp.define_method(&process, "cwd", 0, |interp, _| {
        let cwd = std::env::current_dir().map_err(|e| io_error(interp, e, "uv_cwd", ""))?;
        Ok(Value::from(cwd.to_string_lossy().into_owned()))
    });
    define_async(interp, &process, "nextTick", 1, |interp: Interpreter, args: CallArgs| async move {
        let callback = args.arg(0);
        if !interp.is_callable(&callback) {
            return Err(interp.type_error(format!(
                "The \"callback\" argument must be of type function. Received {}",
                describe_value(&callback)
            )));
        }
        let rest: Vec<Value> = args.args.iter().skip(1).cloned().collect();
        let tick = super::async_fn(&interp, "", 0, move |interp: Interpreter, _| {
            let callback = callback.clone();
            let rest = rest.clone();
            async move { interp.call(&callback, Value::Undefined, rest).await }
        });
        interp.queue_microtask(Value::Object(tick));
        Ok(Value::Undefined)
    });
    interp.define_global("process", Value::Object(process));
}

fn node_platform() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        "windows" => "win32",
        os => os,
    }
}

/// Exports of a host module; `None` for modules the host does not provide
pub fn module_exports(
    interp: &Interpreter,
    module: VirtualModule,
) -> Option<Vec<(String, Value)>> {
    let namespace = match module {
        VirtualModule::Comptime => return None,
        VirtualModule::Fs => fs_module(interp),
        VirtualModule::FsPromises => fs_promises_module(interp),
        VirtualModule::Path => path_module(interp),
    };
    let mut exports: Vec<(String, Value)> = namespace
        .lock()
        .props
        .iter()
        .filter_map(|(key, prop)| match (key, &prop.slot) {
            (PropertyKey::String(name), Slot::Data(v)) => Some((name.to_string(), v.clone())),
            _ => None,
        })
        .collect();
    exports.push(("default".to_string(), Value::Object(namespace)));
    Some(exports)
}

/// Node-style error for a failed file system call
fn io_error(
    interp: &Interpreter,
    error: io::Error,
    syscall: &str,
    path: &str,
) -> Throw {
    let (code, text) = match error.kind() {
        io::ErrorKind::NotFound => ("ENOENT", "no such file or directory"),
        io::ErrorKind::PermissionDenied => ("EACCES", "permission denied"),
        io::ErrorKind::AlreadyExists => ("EEXIST", "file already exists"),
        _ => ("EIO", "i/o error"),
    };
    let message = if path.is_empty() {
        format!("{}: {}, {}", code, text, syscall)
    } else {
        format!("{}: {}, {} '{}'", code, text, syscall, path)
    };
    let err = interp.new_error(ErrorKind::Error, &message);
    {
        let mut object = err.lock();
        object.define("code", Property::data(Value::str(code)));
        object.define("syscall", Property::data(Value::str(syscall)));
        if !path.is_empty() {
            object.define("path", Property::data(Value::str(path)));
        }
    }
    Throw(Value::Object(err))
}

fn path_arg(
    interp: &Interpreter,
    args: &CallArgs,
    i: usize,
    name: &str,
) -> JsResult<String> {
    match args.arg(i) {
        Value::String(s) => Ok(s.to_string()),
        v => Err(interp.type_error(format!(
            "The \"{}\" argument must be of type string. Received {}",
            name,
            describe_value(&v)
        ))),
    }
}

/// `"utf8"` / `{ encoding: "utf8" }` means text; anything else is bytes
fn wants_text(
    interp: &Interpreter,
    options: &Value,
) -> JsResult<bool> {
    let encoding = match options {
        Value::Object(_) => interp
            .get_data(options, &PropertyKey::from("encoding"))
            .unwrap_or_default(),
        v => v.clone(),
    };
    match encoding {
        Value::Undefined | Value::Null => Ok(false),
        Value::String(s) if matches!(&*s, "utf8" | "utf-8" | "UTF-8" | "UTF8") => Ok(true),
        v => Err(interp.type_error(format!("Unknown encoding: {}", describe_value(&v)))),
    }
}

fn contents(
    interp: &Interpreter,
    bytes: Vec<u8>,
    text: bool,
) -> Value {
    if text {
        return Value::from(String::from_utf8_lossy(&bytes).into_owned());
    }
    let items = bytes.into_iter().map(|b| Value::Number(b as f64)).collect();
    Value::Object(new_typed(interp, TypedKind::Uint8, items))
}

/// Bytes to write: strings as UTF-8, typed arrays element-wise
fn data_bytes(
    interp: &Interpreter,
    data: &Value,
) -> JsResult<Vec<u8>> {
    use crate::runtime::value::ObjectKind;

    match data {
        Value::String(s) => Ok(s.as_bytes().to_vec()),
        Value::Object(obj) => match &obj.lock().kind {
            ObjectKind::TypedArray(ta) => Ok(ta
                .elems
                .iter()
                .map(|v| v.as_number().unwrap_or(0.0) as u8)
                .collect()),
            _ => Err(interp.type_error("The \"data\" argument must be of type string or an instance of Uint8Array")),
        },
        v => Err(interp.type_error(format!(
            "The \"data\" argument must be of type string or an instance of Uint8Array. Received {}",
            describe_value(v)
        ))),
    }
}

fn recursive_option(
    interp: &Interpreter,
    options: &Value,
) -> bool {
    matches!(
        interp.get_data(options, &PropertyKey::from("recursive")),
        Some(v) if v.to_boolean()
    )
}

fn stats_object(
    interp: &Interpreter,
    meta: &fs::Metadata,
) -> Value {
    let mtime = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(f64::NAN);
    let stats = interp.object_from(vec![
        ("size", Value::Number(meta.len() as f64)),
        ("mtimeMs", Value::Number(mtime)),
    ]);
    let flags = [
        ("isFile", meta.is_file()),
        ("isDirectory", meta.is_dir()),
        ("isSymbolicLink", meta.file_type().is_symlink()),
    ];
    for (name, flag) in flags {
        interp.define_method(&stats, name, 0, move |_, _| Ok(Value::Bool(flag)));
    }
    Value::Object(stats)
}

fn fs_module(interp: &Interpreter) -> Obj {
    let module = interp.new_object();
    interp.define_method(&module, "readFileSync", 2, |interp, args: CallArgs| {
        let path = path_arg(interp, &args, 0, "path")?;
        let text = wants_text(interp, &args.arg(1))?;
        let bytes = fs::read(&path).map_err(|e| io_error(interp, e, "open", &path))?;
        Ok(contents(interp, bytes, text))
    });
    interp.define_method(&module, "writeFileSync", 3, |interp, args: CallArgs| {
        let path = path_arg(interp, &args, 0, "file")?;
        let bytes = data_bytes(interp, &args.arg(1))?;
        fs::write(&path, bytes).map_err(|e| io_error(interp, e, "open", &path))?;
        Ok(Value::Undefined)
    });
    interp.define_method(&module, "existsSync", 1, |_, args: CallArgs| {
        Ok(Value::Bool(match args.arg(0) {
            Value::String(path) => std::path::Path::new(&*path).exists(),
            _ => false,
        }))
    });
    interp.define_method(&module, "readdirSync", 2, |interp, args: CallArgs| {
        let path = path_arg(interp, &args, 0, "path")?;
        let names = read_dir_names(&path).map_err(|e| io_error(interp, e, "scandir", &path))?;
        Ok(Value::Object(interp.new_array(names)))
    });
    interp.define_method(&module, "statSync", 2, |interp, args: CallArgs| {
        let path = path_arg(interp, &args, 0, "path")?;
        let meta = fs::metadata(&path).map_err(|e| io_error(interp, e, "stat", &path))?;
        Ok(stats_object(interp, &meta))
    });
    interp.define_method(&module, "mkdirSync", 2, |interp, args: CallArgs| {
        let path = path_arg(interp, &args, 0, "path")?;
        let result = if recursive_option(interp, &args.arg(1)) {
            fs::create_dir_all(&path)
        } else {
            fs::create_dir(&path)
        };
        result.map_err(|e| io_error(interp, e, "mkdir", &path))?;
        Ok(Value::Undefined)
    });
    let promises = fs_promises_module(interp);
    module.lock().insert("promises", Value::Object(promises));
    module
}

/// Entry names of a directory, sorted
fn read_dir_names(path: &str) -> io::Result<Vec<Value>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(path)? {
        names.push(entry?.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names.into_iter().map(Value::from).collect())
}

/// Settle an async file operation into a promise
fn settled(
    interp: &Interpreter,
    result: JsResult<Value>,
) -> Value {
    Value::Object(match result {
        Ok(v) => interp.promise_resolved(v),
        Err(Throw(e)) => interp.promise_rejected(e),
    })
}

fn fs_promises_module(interp: &Interpreter) -> Obj {
    let module = interp.new_object();
    define_async(interp, &module, "readFile", 2, |interp: Interpreter, args: CallArgs| async move {
        let result = async {
            let path = path_arg(&interp, &args, 0, "path")?;
            let text = wants_text(&interp, &args.arg(1))?;
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| io_error(&interp, e, "open", &path))?;
            Ok(contents(&interp, bytes, text))
        }
        .await;
        Ok(settled(&interp, result))
    });
    define_async(interp, &module, "writeFile", 3, |interp: Interpreter, args: CallArgs| async move {
        let result = async {
            let path = path_arg(&interp, &args, 0, "file")?;
            let bytes = data_bytes(&interp, &args.arg(1))?;
            tokio::fs::write(&path, bytes)
                .await
                .map_err(|e| io_error(&interp, e, "open", &path))?;
            Ok(Value::Undefined)
        }
        .await;
        Ok(settled(&interp, result))
    });
    define_async(interp, &module, "readdir", 2, |interp: Interpreter, args: CallArgs| async move {
        let result = async {
            let path = path_arg(&interp, &args, 0, "path")?;
            let mut entries = tokio::fs::read_dir(&path)
                .await
                .map_err(|e| io_error(&interp, e, "scandir", &path))?;
            let mut names = Vec::new();
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| io_error(&interp, e, "scandir", &path))?
            {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
            names.sort();
            Ok(Value::Object(interp.new_array(names.into_iter().map(Value::from).collect())))
        }
        .await;
        Ok(settled(&interp, result))
    });
    define_async(interp, &module, "stat", 2, |interp: Interpreter, args: CallArgs| async move {
        let result = async {
            let path = path_arg(&interp, &args, 0, "path")?;
            let meta = tokio::fs::metadata(&path)
                .await
                .map_err(|e| io_error(&interp, e, "stat", &path))?;
            Ok(stats_object(&interp, &meta))
        }
        .await;
        Ok(settled(&interp, result))
    });
    define_async(interp, &module, "mkdir", 2, |interp: Interpreter, args: CallArgs| async move {
        let result = async {
            let path = path_arg(&interp, &args, 0, "path")?;
            let created = if recursive_option(&interp, &args.arg(1)) {
                tokio::fs::create_dir_all(&path).await
            } else {
                tokio::fs::create_dir(&path).await
            };
            created.map_err(|e| io_error(&interp, e, "mkdir", &path))?;
            Ok(Value::Undefined)
        }
        .await;
        Ok(settled(&interp, result))
    });
    define_async(interp, &module, "access", 2, |interp: Interpreter, args: CallArgs| async move {
        let result = async {
            let path = path_arg(&interp, &args, 0, "path")?;
            tokio::fs::metadata(&path)
                .await
                .map_err(|e| io_error(&interp, e, "access", &path))?;
            Ok(Value::Undefined)
        }
        .await;
        Ok(settled(&interp, result))
    });
    module
}

fn path_module(interp: &Interpreter) -> Obj {
    let module = interp.new_object();
    {
        let mut object = module.lock();
        object.insert("sep", Value::str("/"));
        object.insert("delimiter", Value::str(":"));
    }
    interp.define_method(&module, "join", 0, |interp, args: CallArgs| {
        let parts = all_paths(interp, &args)?;
        Ok(Value::from(join(&parts)))
    });
    interp.define_method(&module, "resolve", 0, |interp, args: CallArgs| {
        let parts = all_paths(interp, &args)?;
        let cwd = std::env::current_dir().map_err(|e| io_error(interp, e, "uv_cwd", ""))?;
        Ok(Value::from(resolve(&cwd.to_string_lossy(), &parts)))
    });
    interp.define_method(&module, "normalize", 1, |interp, args: CallArgs| {
        Ok(Value::from(normalize(&path_arg(interp, &args, 0, "path")?)))
    });
    interp.define_method(&module, "isAbsolute", 1, |interp, args: CallArgs| {
        Ok(Value::Bool(path_arg(interp, &args, 0, "path")?.starts_with('/')))
    });
    interp.define_method(&module, "dirname", 1, |interp, args: CallArgs| {
        Ok(Value::from(dirname(&path_arg(interp, &args, 0, "path")?)))
    });
    interp.define_method(&module, "basename", 2, |interp, args: CallArgs| {
        let path = path_arg(interp, &args, 0, "path")?;
        let ext = match args.arg(1) {
            Value::Undefined => None,
            _ => Some(path_arg(interp, &args, 1, "ext")?),
        };
        Ok(Value::from(basename(&path, ext.as_deref())))
    });
    interp.define_method(&module, "extname", 1, |interp, args: CallArgs| {
        Ok(Value::from(extname(&path_arg(interp, &args, 0, "path")?)))
    });
    interp.define_method(&module, "relative", 2, |interp, args: CallArgs| {
        let from = path_arg(interp, &args, 0, "from")?;
        let to = path_arg(interp, &args, 1, "to")?;
        let cwd = std::env::current_dir().map_err(|e| io_error(interp, e, "uv_cwd", ""))?;
        Ok(Value::from(relative(&cwd.to_string_lossy(), &from, &to)))
    });
    interp.define_method(&module, "parse", 1, |interp, args: CallArgs| {
        let path = path_arg(interp, &args, 0, "path")?;
        let base = basename(&path, None);
        let ext = extname(&path);
        let name = base[..base.len() - ext.len()].to_string();
        let dir = match dirname(&path) {
            d if d == "." && !path.starts_with('.') && !path.contains('/') => String::new(),
            d => d,
        };
        let root = if path.starts_with('/') { "/" } else { "" };
        Ok(Value::Object(interp.object_from(vec![
            ("root", Value::str(root)),
            ("dir", Value::from(dir)),
            ("base", Value::from(base)),
            ("ext", Value::from(ext)),
            ("name", Value::from(name)),
        ])))
    });
    define_async(interp, &module, "format", 1, |interp: Interpreter, args: CallArgs| async move {
        let parts = args.arg(0);
        if !parts.is_object() {
            return Err(interp.type_error(format!(
                "The \"pathObject\" argument must be of type object. Received {}",
                describe_value(&parts)
            )));
        }
        let field = |name: &'static str| {
            let interp = interp.clone();
            let parts = parts.clone();
            async move {
                match interp.get_named(&parts, name).await? {
                    Value::Undefined | Value::Null => Ok::<String, Throw>(String::new()),
                    v => Ok(interp.to_string(&v).await?.to_string()),
                }
            }
        };
        let dir = field("dir").await?;
        let root = field("root").await?;
        let base = field("base").await?;
        let name = field("name").await?;
        let ext = field("ext").await?;
        Ok(Value::from(format_path(&dir, &root, &base, &name, &ext)))
    });
    let posix = Value::Object(module.clone());
    module.lock().insert("posix", posix);
    module
}

fn all_paths(
    interp: &Interpreter,
    args: &CallArgs,
) -> JsResult<Vec<String>> {
    (0..args.args.len()).map(|i| path_arg(interp, args, i, "path")).collect()
}

/// Collapse `.` and `..` segments; `..` above the start is kept when `above_root`
fn normalize_segments(
    path: &str,
    above_root: bool,
) -> String {
    let mut out: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if out.last().is_some_and(|last| *last != "..") {
                    out.pop();
                } else if above_root {
                    out.push("..");
                }
            }
            s => out.push(s),
        }
    }
    out.join("/")
}

fn normalize(path: &str) -> String {
    if path.is_empty() {
        return ".".into();
    }
    let absolute = path.starts_with('/');
    let trailing = path.ends_with('/');
    let mut out = normalize_segments(path, !absolute);
    if out.is_empty() && !absolute {
        out.push('.');
    }
    if !out.is_empty() && trailing && out != "." {
        out.push('/');
    }
    if absolute {
        format!("/{}", out)
    } else {
        out
    }
}

fn join(parts: &[String]) -> String {
    let joined = parts
        .iter()
        .filter(|p| !p.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join("/");
    if joined.is_empty() {
        ".".into()
    } else {
        normalize(&joined)
    }
}

fn resolve(
    cwd: &str,
    parts: &[String],
) -> String {
    let mut resolved = String::new();
    for part in parts.iter().rev().filter(|p| !p.is_empty()) {
        resolved = if resolved.is_empty() {
            part.clone()
        } else {
            format!("{}/{}", part, resolved)
        };
        if part.starts_with('/') {
            break;
        }
    }
    if !resolved.starts_with('/') {
        resolved = if resolved.is_empty() {
            cwd.to_string()
        } else {
            format!("{}/{}", cwd, resolved)
        };
    }
    format!("/{}", normalize_segments(&resolved, false))
}

fn dirname(path: &str) -> String {
    if path.is_empty() {
        return ".".into();
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".into();
    }
    match trimmed.rfind('/') {
        None => ".".into(),
        Some(0) => "/".into(),
        Some(i) => trimmed[..i].to_string(),
    }
}

fn basename(
    path: &str,
    ext: Option<&str>,
) -> String {
    let trimmed = path.trim_end_matches('/');
    let base = match trimmed.rfind('/') {
        Some(i) => &trimmed[i + 1..],
        None => trimmed,
    };
    match ext {
        Some(ext) if !ext.is_empty() && base != ext && base.ends_with(ext) => base[..base.len() - ext.len()].to_string(),
        _ => base.to_string(),
    }
}

fn extname(path: &str) -> String {
    let base = basename(path, None);
    if base == ".." {
        return String::new();
    }
    match base.rfind('.') {
        None | Some(0) => String::new(),
        Some(i) => base[i..].to_string(),
    }
}

fn relative(
    cwd: &str,
    from: &str,
    to: &str,
) -> String {
    let from = resolve(cwd, &[from.to_string()]);
    let to = resolve(cwd, &[to.to_string()]);
    let from: Vec<&str> = from.split('/').filter(|s| !s.is_empty()).collect();
    let to: Vec<&str> = to.split('/').filter(|s| !s.is_empty()).collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();
    let mut out: Vec<&str> = vec![".."; from.len() - common];
    out.extend(&to[common..]);
    out.join("/")
}

fn format_path(
    dir: &str,
    root: &str,
    base: &str,
    name: &str,
    ext: &str,
) -> String {
    let file = if base.is_empty() {
        format!("{}{}", name, ext)
    } else {
        base.to_string()
    };
    let dir = if dir.is_empty() { root } else { dir };
    if dir.is_empty() {
        file
    } else if dir == root {
        format!("{}{}", dir, file)
    } else {
        format!("{}/{}", dir, file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("/foo/bar//baz/asdf/quux/.."), "/foo/bar/baz/asdf");
        assert_eq!(normalize("./a/../../b/"), "../b/");
        assert_eq!(normalize(""), ".");
        assert_eq!(normalize("/.."), "/");
    }

    #[test]
    fn test_join_and_resolve() {
        let parts = |p: &[&str]| p.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(join(&parts(&["/foo", "bar", "baz/asdf", "quux", ".."])), "/foo/bar/baz/asdf");
        assert_eq!(join(&parts(&["", ""])), ".");
        assert_eq!(resolve("/home/me", &parts(&["/foo/bar", "./baz"])), "/foo/bar/baz");
        assert_eq!(resolve("/home/me", &parts(&["/foo/bar", "/tmp/file/"])), "/tmp/file");
        assert_eq!(resolve("/home/me", &parts(&["src", "../lib"])), "/home/me/lib");
        assert_eq!(resolve("/home/me", &[]), "/home/me");
    }

    #[test]
    fn test_components() {
        assert_eq!(dirname("/foo/bar/baz/asdf/quux"), "/foo/bar/baz/asdf");
        assert_eq!(dirname("file.ts"), ".");
        assert_eq!(dirname("/file.ts"), "/");
        assert_eq!(basename("/foo/bar/quux.html", None), "quux.html");
        assert_eq!(basename("/foo/bar/quux.html", Some(".html")), "quux");
        assert_eq!(basename("dir/", None), "dir");
        assert_eq!(extname("index.coffee.md"), ".md");
        assert_eq!(extname(".index"), "");
        assert_eq!(extname("index."), ".");
    }

    #[test]
    fn test_relative() {
        assert_eq!(relative("/", "/data/orandea/test/aaa", "/data/orandea/impl/bbb"), "../../impl/bbb");
        assert_eq!(relative("/", "/a/b", "/a/b"), "");
        assert_eq!(relative("/work", "src", "src/util/x.ts"), "util/x.ts");
    }

    #[test]
    fn test_format_path() {
        assert_eq!(format_path("/home/user/dir", "", "file.txt", "", ""), "/home/user/dir/file.txt");
        assert_eq!(format_path("", "/", "", "file", ".txt"), "/file.txt");
        assert_eq!(format_path("", "", "", "file", ".txt"), "file.txt");
    }
}
