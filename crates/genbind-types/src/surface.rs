//! Closable surfaces: the generic shapes a type can be matched through.

use crate::ty::Ty;
use crate::universe::TypeUniverse;

/// The type's own descriptor if it is generic, followed by every generic
/// interface it implements (transitively, arguments substituted).
pub fn closable_surfaces(universe: &TypeUniverse, ty: &Ty) -> Vec<Ty> {
    let mut out = Vec::new();
    if ty.is_generic() {
        out.push(ty.clone());
    }
    for iface in generic_interfaces(universe, ty) {
        if !out.contains(&iface) {
            out.push(iface);
        }
    }
    out
}

/// Generic interfaces implemented by `ty`, excluding `ty` itself.
pub fn generic_interfaces(universe: &TypeUniverse, ty: &Ty) -> Vec<Ty> {
    universe
        .supertypes(ty)
        .into_iter()
        .skip(1)
        .filter(|s| s.is_generic() && universe.is_interface(s))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::universe::{ParamDef, TypeDef};

    #[test]
    fn surfaces_of_open_and_closed_types() {
        let mut u = TypeUniverse::new();
        u.register(TypeDef::interface("IDisposable")).unwrap();
        u.register(TypeDef::interface("IHandler").with_param(ParamDef::new("T")))
            .unwrap();
        u.register(TypeDef::interface("IAsync").with_param(ParamDef::new("T")))
            .unwrap();
        u.register(
            TypeDef::class("BaseHandler")
                .abstract_class()
                .with_param(ParamDef::new("T"))
                .implementing(Ty::generic("IAsync", vec![Ty::param("BaseHandler", 0, "T")])),
        )
        .unwrap();
        u.register(
            TypeDef::class("Handler")
                .with_param(ParamDef::new("T"))
                .with_base(Ty::generic("BaseHandler", vec![Ty::param("Handler", 0, "T")]))
                .implementing(Ty::generic("IHandler", vec![Ty::param("Handler", 0, "T")]))
                .implementing(Ty::named("IDisposable")),
        )
        .unwrap();
        u.register(TypeDef::class("Cmd")).unwrap();

        let open = u.get("Handler").unwrap().open_self();
        let shown: Vec<String> = closable_surfaces(&u, &open).iter().map(|t| t.to_string()).collect();
        assert_eq!(shown, vec!["Handler<T>", "IHandler<T>", "IAsync<T>"]);

        let closed = Ty::generic("Handler", vec![Ty::named("Cmd")]);
        let shown: Vec<String> = generic_interfaces(&u, &closed).iter().map(|t| t.to_string()).collect();
        assert_eq!(shown, vec!["IHandler<Cmd>", "IAsync<Cmd>"]);

        assert!(closable_surfaces(&u, &Ty::named("Cmd")).is_empty());
    }
}
