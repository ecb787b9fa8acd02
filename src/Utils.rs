// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
//! different utility modules used throughout the project
/// logger initialisation and saving of trace reports into csv and tab-separated files
pub mod logger;
/// parse task document with structure like " title1 key1: value1, value2 key2: value2 title2 key3:value3, value4" into a series task
pub mod task_parser;
