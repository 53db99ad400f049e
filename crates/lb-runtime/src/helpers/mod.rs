pub(crate) mod lua_bridge;
