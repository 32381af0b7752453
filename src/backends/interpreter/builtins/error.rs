//! Native error constructors

use super::{async_ctor, define_async, proto_for};
use crate::backends::interpreter::{ErrorKind, Interpreter, JsResult};
use crate::runtime::value::{CallArgs, Property, Value};

pub(crate) fn install(interp: &Interpreter) {
    for kind in ErrorKind::ALL {
        let proto = interp.intrinsics().error_proto(kind);
        let length = if kind == ErrorKind::AggregateError { 2 } else { 1 };
        let ctor = interp.define_constructor(
            kind.name(),
            length,
            async_ctor(move |interp: Interpreter, args: CallArgs| construct_error(interp, args, kind)),
            &proto,
        );
        {
            let mut object = proto.lock();
            object.define("name", Property::hidden(Value::str(kind.name())));
            object.define("message", Property::hidden(Value::str("")));
        }
        if kind != ErrorKind::Error {
            if let Some(Value::Object(base)) = interp.global_value("Error") {
                ctor.lock().proto = Some(base);
            }
        }
        if kind == ErrorKind::Error {
            // V8 extension; stacks are captured at construction already
            interp.define_method(&ctor, "captureStackTrace", 1, |_, _| Ok(Value::Undefined));
        }
    }

    let error_proto = interp.intrinsics().error_proto(ErrorKind::Error);
    define_async(interp, &error_proto, "toString", 0, |interp: Interpreter, args: CallArgs| async move {
        if !args.this.is_object() {
            return Err(interp.type_error("Error.prototype.toString called on non-object"));
        }
        let name = match interp.get_named(&args.this, "name").await? {
            Value::Undefined => "Error".into(),
            v => interp.to_string(&v).await?,
        };
        let message = match interp.get_named(&args.this, "message").await? {
            Value::Undefined => "".into(),
            v => interp.to_string(&v).await?,
        };
        Ok(Value::from(match (name.is_empty(), message.is_empty()) {
            (_, true) => name.to_string(),
            (true, false) => message.to_string(),
            (false, false) => format!("{}: {}", name, message),
        }))
    });
}

async fn construct_error(
    interp: Interpreter,
    args: CallArgs,
    kind: ErrorKind,
) -> JsResult<Value> {
    let (errors, message, options) = if kind == ErrorKind::AggregateError {
        (Some(args.arg(0)), args.arg(1), args.arg(2))
    } else {
        (None, args.arg(0), args.arg(1))
    };
    let message = match message {
        Value::Undefined => "".into(),
        v => interp.to_string(&v).await?,
    };
    let fallback = interp.intrinsics().error_proto(kind);
    let proto = proto_for(&interp, args.new_target.as_ref(), &fallback);
    let error = interp.new_error_with_proto(proto, kind.name(), &message);

    if let Value::Object(opts) = &options {
        let key = "cause".into();
        if interp.has_property(opts, &key) {
            let cause = interp.get(&options, &key).await?;
            error.lock().define("cause", Property::hidden(cause));
        }
    }
    if let Some(errors) = errors {
        let list = interp.iterate_to_vec(&errors).await?;
        let array = interp.new_array(list);
        error.lock().define("errors", Property::hidden(Value::Object(array)));
    }
    Ok(Value::Object(error))
}
