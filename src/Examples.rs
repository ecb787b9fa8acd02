// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
//! examples of usage of RustedTaylor
/// one variable, combinations, multivariable and tree expansions
pub mod series_examples;
